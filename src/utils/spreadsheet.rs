use crate::error::{AppError, AppResult};
use calamine::{Data, Reader, open_workbook_auto_from_rs};
use std::io::Cursor;

/// 名单文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetFormat {
    Csv,
    /// xlsx / xls，由 calamine 按文件内容识别
    Workbook,
}

const WORKBOOK_CONTENT_TYPES: &[&str] = &[
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/vnd.ms-excel",
];

const CSV_CONTENT_TYPES: &[&str] = &["text/csv", "application/csv"];

/// 按扩展名或 Content-Type 判断格式，均不匹配时返回 None
pub fn detect_format(file_name: &str, content_type: Option<&str>) -> Option<SheetFormat> {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase());
    match ext.as_deref() {
        Some("csv") => return Some(SheetFormat::Csv),
        Some("xlsx") | Some("xls") => return Some(SheetFormat::Workbook),
        _ => {}
    }

    let content_type = content_type?.to_ascii_lowercase();
    if CSV_CONTENT_TYPES.contains(&content_type.as_str()) {
        Some(SheetFormat::Csv)
    } else if WORKBOOK_CONTENT_TYPES.contains(&content_type.as_str()) {
        Some(SheetFormat::Workbook)
    } else {
        None
    }
}

/// 读取第一张表的第一列：逐行取值、去空白、丢弃空行（不跳过首行）
pub fn parse_participants(
    bytes: &[u8],
    file_name: &str,
    content_type: Option<&str>,
) -> AppResult<Vec<String>> {
    let format = detect_format(file_name, content_type).ok_or_else(|| {
        AppError::MalformedImport(
            "Unsupported file type. Please upload an Excel (.xlsx, .xls) or CSV file".to_string(),
        )
    })?;

    let raw = match format {
        SheetFormat::Csv => read_csv_first_column(bytes)?,
        SheetFormat::Workbook => read_workbook_first_column(bytes)?,
    };

    let names: Vec<String> = raw
        .into_iter()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect();

    if names.is_empty() {
        return Err(AppError::MalformedImport(
            "No participant names found in the first column".to_string(),
        ));
    }
    Ok(names)
}

fn read_csv_first_column(bytes: &[u8]) -> AppResult<Vec<String>> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut values = Vec::new();
    for record in reader.byte_records() {
        let record =
            record.map_err(|e| AppError::MalformedImport(format!("Invalid CSV file: {e}")))?;
        if let Some(cell) = record.get(0) {
            values.push(String::from_utf8_lossy(cell).into_owned());
        }
    }
    Ok(values)
}

fn read_workbook_first_column(bytes: &[u8]) -> AppResult<Vec<String>> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| AppError::MalformedImport(format!("Invalid spreadsheet: {e}")))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| AppError::MalformedImport("Spreadsheet has no sheets".to_string()))?
        .map_err(|e| AppError::MalformedImport(format!("Invalid spreadsheet: {e}")))?;

    // 数据不是从 A 列开始时，第一列为空
    match range.start() {
        Some((_, 0)) => {}
        _ => return Ok(Vec::new()),
    }

    Ok(range
        .rows()
        .filter_map(|row| row.first())
        .map(cell_to_string)
        .collect())
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        // 整数值的单元格不带小数点
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}
