use actix_web::web;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::entities::DrawMode;
use crate::handlers;
use crate::models::*;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::reward::list_rewards,
        handlers::reward::create_reward,
        handlers::reward::get_summary,
        handlers::reward::update_reward,
        handlers::reward::delete_reward,
        handlers::settings::get_settings,
        handlers::settings::update_settings,
        handlers::participant::list_participants,
        handlers::participant::clear_participants,
        handlers::upload::upload_participants,
        handlers::upload::upload_reward_image,
        handlers::upload::upload_background,
        handlers::upload::upload_audio,
        handlers::export::export_winners,
        handlers::draw::draw,
        handlers::draw::draw_status,
        handlers::draw::draw_events,
    ),
    components(
        schemas(
            Reward,
            RewardPatch,
            CreateRewardRequest,
            UpdateRewardRequest,
            RewardSummary,
            SettingsResponse,
            UpdateSettingsRequest,
            DrawMode,
            ParticipantListResponse,
            ParticipantImportResponse,
            MediaUploadResponse,
            DrawPlan,
            DrawReport,
            DrawStop,
            DeclineReason,
            RaceLostReason,
            DrawStatusResponse,
            AnimatorState,
            DrawEvent,
            ApiError,
        )
    ),
    tags(
        (name = "rewards", description = "Reward management API"),
        (name = "settings", description = "Display settings API"),
        (name = "participants", description = "Participant roster API"),
        (name = "upload", description = "Roster import and media upload API"),
        (name = "export", description = "Winners export API"),
        (name = "draw", description = "Draw engine API"),
    ),
    info(
        title = "Lucky Draw Backend API",
        version = "1.0.0",
        description = "Lucky Draw Backend REST API documentation"
    ),
    servers(
        (url = "/api/v1", description = "Local server")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}
