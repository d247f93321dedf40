use actix_cors::Cors;

/// 后台与展示屏可能部署在不同端口，放开跨域
pub fn create_cors() -> Cors {
    Cors::default()
        .allow_any_origin()
        .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
        .allow_any_header()
        .expose_headers(vec![actix_web::http::header::CONTENT_DISPOSITION])
        .max_age(3600)
}
