use crate::error::{AppError, AppResult};
use crate::models::Reward;
use crate::services::RewardStore;
use crate::utils::export_timestamp;
use rust_xlsxwriter::{Color, Format, FormatAlign, Workbook, XlsxError};
use std::sync::Arc;

pub const EXPORT_SHEET_NAME: &str = "Winners";

/// 导出表：表头 + 每个奖项一行（中奖者列按最多的奖项补齐）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WinnersTable {
    pub header: Vec<String>,
    pub rows: Vec<WinnersRow>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WinnersRow {
    pub reward_name: String,
    pub total_quantity: i64,
    pub winners_count: usize,
    /// 长度与表头中的中奖者列数一致，不足处为空字符串
    pub winners: Vec<String>,
}

pub fn build_winners_table(rewards: &[Reward]) -> WinnersTable {
    let max_winners = rewards
        .iter()
        .map(|r| r.winners.len())
        .max()
        .unwrap_or(0)
        .max(1);

    let mut header = vec![
        "Reward Name".to_string(),
        "Total Quantity".to_string(),
        "Winners Count".to_string(),
    ];
    header.extend((1..=max_winners).map(|i| format!("Winner #{i}")));

    let rows = rewards
        .iter()
        .map(|r| {
            let mut winners = r.winners.clone();
            winners.resize(max_winners, String::new());
            WinnersRow {
                reward_name: r.name.clone(),
                total_quantity: r.total_quantity,
                winners_count: r.winners.len(),
                winners,
            }
        })
        .collect();

    WinnersTable { header, rows }
}

/// 生成好的导出文件
pub struct WinnersExport {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Clone)]
pub struct ExportService {
    store: Arc<dyn RewardStore>,
}

impl ExportService {
    pub fn new(store: Arc<dyn RewardStore>) -> Self {
        Self { store }
    }

    /// 以存储中的数据为准导出；没有奖项时返回 NotFound
    pub async fn export_winners(&self) -> AppResult<WinnersExport> {
        let rewards = self.store.list().await?;
        if rewards.is_empty() {
            return Err(AppError::NotFound("No rewards to export".to_string()));
        }

        let table = build_winners_table(&rewards);
        let bytes = write_xlsx(&table)
            .map_err(|e| AppError::InternalError(format!("Failed to build workbook: {e}")))?;

        log::info!("Exported winners for {} rewards", table.rows.len());
        Ok(WinnersExport {
            file_name: format!("winners-export-{}.xlsx", export_timestamp()),
            bytes,
        })
    }
}

fn write_xlsx(table: &WinnersTable) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(EXPORT_SHEET_NAME)?;

    let header_format = Format::new()
        .set_bold()
        .set_background_color(Color::RGB(0xD4AF37))
        .set_align(FormatAlign::Center);

    for (col, title) in table.header.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, title, &header_format)?;
    }
    sheet.set_column_width(0, 25)?;
    sheet.set_column_width(1, 15)?;
    sheet.set_column_width(2, 15)?;
    for col in 3..table.header.len() {
        sheet.set_column_width(col as u16, 20)?;
    }

    for (idx, row) in table.rows.iter().enumerate() {
        let r = idx as u32 + 1;
        sheet.write_string(r, 0, &row.reward_name)?;
        sheet.write_number(r, 1, row.total_quantity as f64)?;
        sheet.write_number(r, 2, row.winners_count as f64)?;
        for (offset, winner) in row.winners.iter().enumerate() {
            if !winner.is_empty() {
                sheet.write_string(r, 3 + offset as u16, winner)?;
            }
        }
    }

    workbook.save_to_buffer()
}
