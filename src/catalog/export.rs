//! Spreadsheet export of the catalog.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};
use tracing::info;

use super::stats::CatalogStats;
use super::Result;
use crate::classify::CalendarHints;
use crate::models::CatalogRecord;
use crate::rules::{CalendarRules, RuleSet};

/// Longest worksheet name Excel accepts.
const MAX_SHEET_NAME: usize = 31;

const INVALID_SHEET_CHARS: &[char] = &['[', ']', ':', '*', '?', '/', '\\'];

const RECORD_HEADERS: &[&str] = &[
    "id",
    "categoria",
    "subcategoria",
    "nome_arquivo",
    "caminho_relativo",
    "texto_extraido_nome",
    "palavras_chave",
    "data_processamento",
    "tamanho_arquivo",
    "ano",
    "serie",
    "plataforma",
    "promocao",
    "categoria_ia",
    "tom_marketing",
    "urgencia",
];

const PLANNING_HEADERS: &[&str] = &[
    "arquivo",
    "categoria",
    "subcategoria",
    "mes",
    "tema",
    "dia_semana",
    "horario",
    "insight",
];

/// Writes the catalog as a multi-sheet workbook.
///
/// Sheets: `Banco_Completo`, one per category, `Estatisticas`,
/// `Palavras_Chave_Top` and `Planejamento`.
#[derive(Debug, Clone)]
pub struct WorkbookExporter {
    calendar: CalendarRules,
}

impl WorkbookExporter {
    pub fn new(rules: &RuleSet) -> Self {
        Self {
            calendar: rules.calendar.clone(),
        }
    }

    /// Write `records` to a new workbook at `path`, replacing any file there.
    pub fn export(&self, records: &[CatalogRecord], path: &Path) -> Result<()> {
        let header = Format::new().set_bold();
        let stats = CatalogStats::compute(records);
        let mut used = HashSet::new();
        let mut workbook = Workbook::new();

        let sheet = workbook.add_worksheet();
        sheet.set_name(unique_sheet_name("Banco_Completo", &mut used))?;
        write_records(sheet, records.iter(), &header)?;

        let mut by_category: BTreeMap<&str, Vec<&CatalogRecord>> = BTreeMap::new();
        for record in records {
            by_category.entry(record.category.as_str()).or_default().push(record);
        }
        for (category, rows) in &by_category {
            let sheet = workbook.add_worksheet();
            sheet.set_name(unique_sheet_name(category, &mut used))?;
            write_records(sheet, rows.iter().copied(), &header)?;
        }

        let sheet = workbook.add_worksheet();
        sheet.set_name(unique_sheet_name("Estatisticas", &mut used))?;
        write_stats(sheet, &stats, &header)?;

        let sheet = workbook.add_worksheet();
        sheet.set_name(unique_sheet_name("Palavras_Chave_Top", &mut used))?;
        write_counts(sheet, ("palavra", "frequencia"), &stats.top_keywords, &header)?;

        let sheet = workbook.add_worksheet();
        sheet.set_name(unique_sheet_name("Planejamento", &mut used))?;
        self.write_planning(sheet, records, &header)?;

        workbook.save(path)?;
        info!(
            "Exported {} records in {} category sheets to {}",
            records.len(),
            by_category.len(),
            path.display()
        );
        Ok(())
    }

    fn write_planning(
        &self,
        sheet: &mut Worksheet,
        records: &[CatalogRecord],
        header: &Format,
    ) -> std::result::Result<(), XlsxError> {
        write_header(sheet, PLANNING_HEADERS, header)?;
        for (i, record) in records.iter().enumerate() {
            let row = i as u32 + 1;
            let hints = CalendarHints::for_name(&record.file_name, &self.calendar);
            sheet.write_string(row, 0, &record.file_name)?;
            sheet.write_string(row, 1, &record.category)?;
            sheet.write_string(row, 2, &record.subcategory)?;
            sheet.write_string(row, 3, &hints.month)?;
            sheet.write_string(row, 4, &hints.theme)?;
            sheet.write_string(row, 5, &hints.weekday)?;
            sheet.write_string(row, 6, &hints.daypart)?;
            sheet.write_string(row, 7, hints.insight.as_deref().unwrap_or(""))?;
        }
        Ok(())
    }
}

/// Make `name` a valid worksheet name not yet in `used`, and record it.
pub fn unique_sheet_name(name: &str, used: &mut HashSet<String>) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if INVALID_SHEET_CHARS.contains(&c) { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim_matches('\'').trim();
    let base: String = if cleaned.is_empty() {
        "Planilha".to_string()
    } else {
        cleaned.chars().take(MAX_SHEET_NAME).collect()
    };

    let mut candidate = base.clone();
    let mut n = 1;
    while used.contains(&candidate.to_lowercase()) {
        n += 1;
        let suffix = format!("_{}", n);
        let keep = MAX_SHEET_NAME - suffix.chars().count();
        candidate = format!("{}{}", base.chars().take(keep).collect::<String>(), suffix);
    }

    used.insert(candidate.to_lowercase());
    candidate
}

fn write_header(sheet: &mut Worksheet, headers: &[&str], format: &Format) -> std::result::Result<(), XlsxError> {
    for (col, title) in headers.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *title, format)?;
    }
    Ok(())
}

fn write_records<'a>(
    sheet: &mut Worksheet,
    records: impl Iterator<Item = &'a CatalogRecord>,
    header: &Format,
) -> std::result::Result<(), XlsxError> {
    write_header(sheet, RECORD_HEADERS, header)?;
    for (i, r) in records.enumerate() {
        let row = i as u32 + 1;
        sheet.write_number(row, 0, r.id as f64)?;
        sheet.write_string(row, 1, &r.category)?;
        sheet.write_string(row, 2, &r.subcategory)?;
        sheet.write_string(row, 3, &r.file_name)?;
        sheet.write_string(row, 4, &r.relative_path)?;
        sheet.write_string(row, 5, &r.extracted_text)?;
        sheet.write_string(row, 6, r.keywords_joined())?;
        sheet.write_string(row, 7, r.processed_at.to_rfc3339())?;
        sheet.write_number(row, 8, r.file_size as f64)?;
        if let Some(year) = r.year {
            sheet.write_number(row, 9, f64::from(year))?;
        }
        sheet.write_string(row, 10, r.series.as_deref().unwrap_or(""))?;
        sheet.write_string(row, 11, r.platform.as_deref().unwrap_or(""))?;
        sheet.write_string(row, 12, r.promotion.as_deref().unwrap_or(""))?;
        sheet.write_string(row, 13, &r.content_category)?;
        sheet.write_string(row, 14, &r.tone)?;
        sheet.write_number(row, 15, f64::from(r.urgency))?;
    }
    Ok(())
}

fn write_stats(sheet: &mut Worksheet, stats: &CatalogStats, header: &Format) -> std::result::Result<(), XlsxError> {
    write_header(sheet, &["metrica", "valor"], header)?;
    let mut row = 1;
    for (label, value) in stats.summary_rows() {
        sheet.write_string(row, 0, label)?;
        sheet.write_string(row, 1, value)?;
        row += 1;
    }

    row += 1;
    sheet.write_string_with_format(row, 0, "categoria_ia", header)?;
    sheet.write_string_with_format(row, 1, "quantidade", header)?;
    for (label, count) in &stats.top_content_categories {
        row += 1;
        sheet.write_string(row, 0, label)?;
        sheet.write_number(row, 1, *count as f64)?;
    }

    row += 2;
    sheet.write_string_with_format(row, 0, "tom_marketing", header)?;
    sheet.write_string_with_format(row, 1, "quantidade", header)?;
    for (label, count) in &stats.top_tones {
        row += 1;
        sheet.write_string(row, 0, label)?;
        sheet.write_number(row, 1, *count as f64)?;
    }
    Ok(())
}

fn write_counts(
    sheet: &mut Worksheet,
    headers: (&str, &str),
    counts: &[(String, usize)],
    header: &Format,
) -> std::result::Result<(), XlsxError> {
    write_header(sheet, &[headers.0, headers.1], header)?;
    for (i, (label, count)) in counts.iter().enumerate() {
        let row = i as u32 + 1;
        sheet.write_string(row, 0, label)?;
        sheet.write_number(row, 1, *count as f64)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;

    fn record(category: &str, file_name: &str) -> CatalogRecord {
        CatalogRecord {
            id: 1,
            category: category.to_string(),
            subcategory: "futebol".to_string(),
            file_name: file_name.to_string(),
            relative_path: format!("{}/futebol/{}", category, file_name),
            extracted_text: "futebol ao vivo".to_string(),
            keywords: vec!["futebol".to_string(), "vivo".to_string()],
            processed_at: Utc::now(),
            file_size: 10,
            year: Some(2025),
            series: None,
            platform: None,
            promotion: None,
            content_category: "esportes".to_string(),
            tone: "neutro".to_string(),
            urgency: 0,
            content_hash: "abc".to_string(),
        }
    }

    #[test]
    fn test_sheet_names_are_valid_and_unique() {
        let mut used = HashSet::new();
        assert_eq!(unique_sheet_name("01_Esportes", &mut used), "01_Esportes");
        assert_eq!(unique_sheet_name("01_ESPORTES", &mut used), "01_ESPORTES_2");
        assert_eq!(unique_sheet_name("a/b:c", &mut used), "a_b_c");
        assert_eq!(unique_sheet_name("", &mut used), "Planilha");

        let long = "04_Conteudo_Especializado_Extra_Longo";
        let first = unique_sheet_name(long, &mut used);
        let second = unique_sheet_name(long, &mut used);
        assert_eq!(first.chars().count(), 31);
        assert_eq!(second.chars().count(), 31);
        assert_ne!(first, second);
        assert!(second.ends_with("_2"));
    }

    #[test]
    fn test_export_writes_workbook() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("catalogo.xlsx");
        let exporter = WorkbookExporter::new(&RuleSet::embedded().unwrap());

        exporter
            .export(
                &[record("01_Esportes", "a.png"), record("05_Promocoes", "b.png")],
                &path,
            )
            .unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"PK"));
    }

    #[test]
    fn test_export_empty_catalog() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vazio.xlsx");
        WorkbookExporter::new(&RuleSet::embedded().unwrap())
            .export(&[], &path)
            .unwrap();
        assert!(path.exists());
    }
}
