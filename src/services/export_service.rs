use crate::error::Result;
use crate::models::vacancy::VacancyRecord;
use crate::services::analytics_service::SegmentShare;
use rust_xlsxwriter::*;

pub struct ExportService;

struct Palette {
    primary: Color,
    header_bg: Color,
    header_text: Color,
    alt_row_1: Color,
    alt_row_2: Color,
    border: Color,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            primary: Color::RGB(0x1E293B),    // Slate 800
            header_bg: Color::RGB(0x0F172A),  // Slate 900
            header_text: Color::White,
            alt_row_1: Color::RGB(0xF8FAFC),  // Slate 50
            alt_row_2: Color::White,
            border: Color::RGB(0xE2E8F0),     // Slate 200
        }
    }
}

impl ExportService {
    fn title_rows(
        worksheet: &mut Worksheet,
        palette: &Palette,
        last_col: u16,
        title: &str,
        subtitle: &str,
    ) -> Result<()> {
        let title_format = Format::new()
            .set_font_size(16)
            .set_bold()
            .set_font_color(palette.header_text)
            .set_background_color(palette.primary)
            .set_align(FormatAlign::CenterAcross)
            .set_align(FormatAlign::VerticalCenter);
        worksheet.set_row_height(0, 40)?;
        worksheet.merge_range(0, 0, 0, last_col, title, &title_format)?;

        let subtitle_format = Format::new()
            .set_font_size(10)
            .set_italic()
            .set_font_color(Color::RGB(0x94A3B8))
            .set_background_color(palette.primary)
            .set_align(FormatAlign::CenterAcross)
            .set_align(FormatAlign::VerticalCenter);
        worksheet.set_row_height(1, 22)?;
        worksheet.merge_range(1, 0, 1, last_col, subtitle, &subtitle_format)?;
        Ok(())
    }

    fn header_row(
        worksheet: &mut Worksheet,
        palette: &Palette,
        columns: &[(&str, f64)],
    ) -> Result<()> {
        let header_format = Format::new()
            .set_bold()
            .set_font_size(10)
            .set_font_color(palette.header_text)
            .set_background_color(palette.header_bg)
            .set_align(FormatAlign::Center)
            .set_align(FormatAlign::VerticalCenter)
            .set_text_wrap()
            .set_border(FormatBorder::Thin)
            .set_border_color(palette.border);

        worksheet.set_row_height(2, 30)?;
        for (i, (name, width)) in columns.iter().enumerate() {
            worksheet.set_column_width(i as u16, *width)?;
            worksheet.write_string_with_format(2, i as u16, *name, &header_format)?;
        }
        Ok(())
    }

    fn row_format(palette: &Palette, idx: usize) -> Format {
        let bg = if idx % 2 == 0 { palette.alt_row_1 } else { palette.alt_row_2 };
        Format::new()
            .set_font_size(10)
            .set_background_color(bg)
            .set_align(FormatAlign::VerticalCenter)
            .set_border(FormatBorder::Thin)
            .set_border_color(palette.border)
    }

    /// Styled workbook with a vacancy sheet and a segment sheet.
    pub fn generate_vacancies_xlsx(
        records: &[VacancyRecord],
        segments: &[SegmentShare],
    ) -> Result<Vec<u8>> {
        let palette = Palette::default();
        let mut workbook = Workbook::new();
        let now = chrono::Utc::now().format("%d.%m.%Y %H:%M UTC").to_string();

        {
            let worksheet = workbook.add_worksheet();
            worksheet.set_name("Вакансии")?;

            let columns = [
                ("№", 8.0),
                ("ID", 14.0),
                ("Должность", 40.0),
                ("Работодатель", 32.0),
                ("Регион", 22.0),
                ("Сегмент", 20.0),
                ("Уровень", 18.0),
                ("Зарплата, руб", 16.0),
                ("Опыт", 20.0),
                ("График", 18.0),
                ("Навыки", 50.0),
                ("Дата публикации", 18.0),
            ];
            let last_col = (columns.len() - 1) as u16;

            let subtitle = format!("Дата экспорта: {}  •  Всего вакансий: {}", now, records.len());
            Self::title_rows(worksheet, &palette, last_col, "Промышленные вакансии", &subtitle)?;
            Self::header_row(worksheet, &palette, &columns)?;

            let data_start_row = 3;
            for (idx, record) in records.iter().enumerate() {
                let row = data_start_row + idx as u32;
                let base_fmt = Self::row_format(&palette, idx);
                let center_fmt = base_fmt.clone().set_align(FormatAlign::Center);
                let wrap_fmt = base_fmt.clone().set_text_wrap();
                let money_fmt = center_fmt.clone().set_num_format("# ##0");

                worksheet.set_row_height(row, 22)?;
                worksheet.write_number_with_format(row, 0, (idx + 1) as f64, &center_fmt)?;
                worksheet.write_string_with_format(
                    row,
                    1,
                    record.external_id.as_deref().unwrap_or("—"),
                    &center_fmt,
                )?;
                worksheet.write_string_with_format(row, 2, &record.title, &base_fmt.clone().set_bold())?;
                worksheet.write_string_with_format(
                    row,
                    3,
                    record.employer_name.as_deref().unwrap_or("—"),
                    &base_fmt,
                )?;
                worksheet.write_string_with_format(row, 4, record.region_name().unwrap_or("—"), &base_fmt)?;
                worksheet.write_string_with_format(
                    row,
                    5,
                    record.industry_segment.unwrap_or_default().label(),
                    &base_fmt,
                )?;
                worksheet.write_string_with_format(
                    row,
                    6,
                    record.position_level.unwrap_or_default().label(),
                    &center_fmt,
                )?;
                match record.salary_avg_rub {
                    Some(salary) => worksheet.write_number_with_format(row, 7, salary.round(), &money_fmt)?,
                    None => worksheet.write_string_with_format(row, 7, "—", &center_fmt)?,
                };
                worksheet.write_string_with_format(row, 8, record.experience.as_deref().unwrap_or("—"), &base_fmt)?;
                worksheet.write_string_with_format(row, 9, record.schedule.as_deref().unwrap_or("—"), &base_fmt)?;
                let skills = if record.skills.is_empty() {
                    "—".to_string()
                } else {
                    record.skills.join(", ")
                };
                worksheet.write_string_with_format(row, 10, &skills, &wrap_fmt)?;
                let published = record
                    .published_at
                    .map(|d| d.format("%d.%m.%Y").to_string())
                    .unwrap_or_else(|| "—".to_string());
                worksheet.write_string_with_format(row, 11, &published, &center_fmt)?;
            }

            let total_row = data_start_row + records.len() as u32 + 1;
            let summary_fmt = Format::new()
                .set_bold()
                .set_font_size(10)
                .set_font_color(palette.primary)
                .set_background_color(Color::RGB(0xE0E7FF)) // Indigo 100
                .set_align(FormatAlign::Center)
                .set_align(FormatAlign::VerticalCenter)
                .set_border(FormatBorder::Thin)
                .set_border_color(palette.border);

            let with_salary = records.iter().filter(|r| r.has_salary).count();
            worksheet.set_row_height(total_row, 26)?;
            worksheet.merge_range(
                total_row,
                0,
                total_row,
                3,
                &format!("Итого: {} вакансий", records.len()),
                &summary_fmt,
            )?;
            worksheet.merge_range(
                total_row,
                4,
                total_row,
                last_col,
                &format!("С указанной зарплатой: {}", with_salary),
                &summary_fmt,
            )?;

            worksheet.set_freeze_panes(3, 0)?;
            worksheet.autofilter(
                2,
                0,
                (data_start_row + records.len() as u32).saturating_sub(1).max(2),
                last_col,
            )?;
        }

        {
            let worksheet = workbook.add_worksheet();
            worksheet.set_name("Сегменты")?;

            let columns = [
                ("Сегмент", 28.0),
                ("Вакансий", 14.0),
                ("Доля, %", 12.0),
                ("ДИ нижн., %", 14.0),
                ("ДИ верхн., %", 14.0),
            ];
            let last_col = (columns.len() - 1) as u16;
            let subtitle = format!("Дата экспорта: {}  •  Сегментов: {}", now, segments.len());
            Self::title_rows(worksheet, &palette, last_col, "Распределение по сегментам", &subtitle)?;
            Self::header_row(worksheet, &palette, &columns)?;

            for (idx, share) in segments.iter().enumerate() {
                let row = 3 + idx as u32;
                let base_fmt = Self::row_format(&palette, idx);
                let pct_fmt = base_fmt.clone().set_align(FormatAlign::Center).set_num_format("0.00");

                worksheet.write_string_with_format(row, 0, &share.label, &base_fmt)?;
                worksheet.write_number_with_format(row, 1, share.count as f64, &pct_fmt.clone().set_num_format("0"))?;
                worksheet.write_number_with_format(row, 2, share.interval.percentage, &pct_fmt)?;
                worksheet.write_number_with_format(row, 3, share.interval.ci_lower, &pct_fmt)?;
                worksheet.write_number_with_format(row, 4, share.interval.ci_upper, &pct_fmt)?;
            }
            worksheet.set_freeze_panes(3, 0)?;
        }

        let buffer = workbook.save_to_buffer()?;
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::classification::{IndustrySegment, PositionLevel};
    use crate::services::statistics_service::calculate_proportion_confidence_interval;

    #[test]
    fn produces_a_zip_container() {
        let records = vec![VacancyRecord {
            external_id: Some("1".into()),
            title: "Токарь".into(),
            employer_name: Some("Завод".into()),
            industry_segment: Some(IndustrySegment::Machinery),
            position_level: Some(PositionLevel::Worker),
            salary_avg_rub: Some(75_000.0),
            has_salary: true,
            skills: vec!["Токарные работы".into()],
            ..Default::default()
        }];
        let segments = vec![SegmentShare {
            segment: IndustrySegment::Machinery,
            label: IndustrySegment::Machinery.label().to_string(),
            count: 1,
            interval: calculate_proportion_confidence_interval(1, 1, 0.95),
        }];

        let bytes = ExportService::generate_vacancies_xlsx(&records, &segments).unwrap();
        assert!(bytes.starts_with(b"PK"));
    }

    #[test]
    fn empty_export_still_builds() {
        let bytes = ExportService::generate_vacancies_xlsx(&[], &[]).unwrap();
        assert!(!bytes.is_empty());
    }
}
