use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::error::{PipelineError, Result};
use crate::models::{CellValue, Field, NormalizedRecord, RawTable, SourceId};

pub const COLUMN_MAPPING: &[(&str, Field)] = &[
    ("ID", Field::Id),
    ("Время создания", Field::CreatedAt),
    ("Наименование вашей образовательной организации", Field::Organization),
    ("Код ребёнка", Field::Code),
    (
        "Согласие родителя (законного представителя) на проведение психолого-педагогического обследования и сопровождение ребёнка получено",
        Field::ConsentAssessment,
    ),
    (
        "Согласие родителя (законного представителя) на обработку персональных данных ребёнка получено",
        Field::ConsentPersonalData,
    ),
    ("Возрастная группа, к которой относится ребенок в текущем учебном году", Field::AgeGroup),
    ("Ввести возрастную группу", Field::AgeGroupInput),
    ("Субтест И1-1 \"Рассуждения\". Укажите суммарную оценку", Field::ReasoningSum),
    (
        "Субтест И1-2 \"Рассуждения\". Укажите значение по каждому критерию / Связность",
        Field::ReasoningCoherence,
    ),
    (
        "Субтест И1-2 \"Рассуждения\". Укажите значение по каждому критерию / Речевое оформление высказываний",
        Field::ReasoningSpeech,
    ),
    (
        "Субтест И1-2 \"Рассуждения\". Укажите значение по каждому критерию / Самостоятельность рассуждения",
        Field::ReasoningIndependence,
    ),
    ("Субтест И2 \"Сходство\". Укажите суммарную оценку.", Field::SimilaritySum),
    (
        "Субтест И3-1-1 \"Будь внимателен\". Введите количество колец, просмотренных за 1-ю минуту (целое число)",
        Field::Attention1Rings,
    ),
    (
        "Субтест И3-1-2 \"Будь внимателен\". Введите количество ошибок, допущенных за 1-ю минуту (целое число)",
        Field::Attention1Errors,
    ),
    (
        "Субтест И3-2-1 \"Будь внимателен\". Введите количество колец, просмотренных за 2-ю минуту (целое число)",
        Field::Attention2Rings,
    ),
    (
        "Субтест И3-2-2 \"Будь внимателен\". Введите количество ошибок, допущенных за 2-ю минуту (целое число)",
        Field::Attention2Errors,
    ),
    (
        "Субтест И3-3-1 \"Будь внимателен\". Введите количество колец, просмотренных за 3-ю минуту (целое число)",
        Field::Attention3Rings,
    ),
    (
        "Субтест И3-3-2 \"Будь внимателен\". Введите количество ошибок, допущенных за 3-ю минуту (целое число)",
        Field::Attention3Errors,
    ),
    (
        "Субтест И3-4-1 \"Будь внимателен\". Введите количество колец, просмотренных за 4-ю минуту (целое число)",
        Field::Attention4Rings,
    ),
    (
        "Субтест И3-4-2 \"Будь внимателен\". Введите количество ошибок, допущенных за 4-ю минуту (целое число)",
        Field::Attention4Errors,
    ),
    (
        "Субтест И3-5-1 \"Будь внимателен\". Введите количество колец, просмотренных за 5-ю минуту (целое число)",
        Field::Attention5Rings,
    ),
    (
        "Субтест И3-5-2 \"Будь внимателен\". Введите количество ошибок, допущенных за 5-ю минуту (целое число)",
        Field::Attention5Errors,
    ),
    ("Субтест И4 \"Недостающие детали\". Введите число верных ответов", Field::MissingDetailsSum),
    (
        "Субтест И5-1-1 \"Лабиринты\": укажите время прохождения лабиринта 1 (в секундах)",
        Field::Labyrinth1Time,
    ),
    (
        "Субтест И5-1-2 \"Лабиринты\": укажите количество ошибок при прохождении лабиринта 1 (целое число)",
        Field::Labyrinth1Errors,
    ),
    (
        "Субтест И5-1-3 \"Лабиринты\". Отметьте, дошел ли ребенок до цели в указанное Вами время в лабиринте 1",
        Field::Labyrinth1Reached,
    ),
    (
        "Субтест И5-2-1 \"Лабиринты\": укажите время прохождения лабиринта 2 (в секундах)",
        Field::Labyrinth2Time,
    ),
    (
        "Субтест И5-2-2 \"Лабиринты\": укажите количество ошибок при прохождении лабиринта 2 (целое число)",
        Field::Labyrinth2Errors,
    ),
    (
        "Субтест И5-2-3 \"Лабиринты\". Отметьте, дошел ли ребенок до цели в указанное Вами время в лабиринте 2",
        Field::Labyrinth2Reached,
    ),
    (
        "Субтест И5-3-1 \"Лабиринты\": укажите время прохождения лабиринта 3 (в секундах)",
        Field::Labyrinth3Time,
    ),
    (
        "Субтест И5-3-2 \"Лабиринты\": укажите количество ошибок при прохождении лабиринта 3 (целое число)",
        Field::Labyrinth3Errors,
    ),
    (
        "Субтест И5-3-3 \"Лабиринты\". Отметьте, дошел ли ребенок до цели в указанное Вами время в лабиринте 3",
        Field::Labyrinth3Reached,
    ),
    (
        "Субтест И5-4-1 \"Лабиринты\": укажите время прохождения лабиринта 4 (в секундах)",
        Field::Labyrinth4Time,
    ),
    (
        "Субтест И5-4-2 \"Лабиринты\": укажите количество ошибок при прохождении лабиринта 4 (целое число)",
        Field::Labyrinth4Errors,
    ),
    (
        "Субтест И5-4-3 \"Лабиринты\". Отметьте, дошел ли ребенок до цели в указанное Вами время в лабиринте 4",
        Field::Labyrinth4Reached,
    ),
    (
        "Субтест И5-5-1 \"Лабиринты\": укажите время прохождения лабиринта 5 (в секундах)",
        Field::Labyrinth5Time,
    ),
    (
        "Субтест И5-5-2 \"Лабиринты\": укажите количество ошибок при прохождении лабиринта 5 (целое число)",
        Field::Labyrinth5Errors,
    ),
    (
        "Субтест И5-5-3 \"Лабиринты\". Отметьте, дошел ли ребенок до цели в указанное Вами время в лабиринте 5",
        Field::Labyrinth5Reached,
    ),
    (
        "Адаптированная проба \"Художник\". \nВведите значения по шкалам В1 и В2. / В1",
        Field::ArtistV1,
    ),
    (
        "Адаптированная проба \"Художник\". \nВведите значения по шкалам В1 и В2. / В2",
        Field::ArtistV2,
    ),
    (
        "Адаптированная проба \"Художник\". Для экспертного определения значения по шкале В3 присоедините качественное фото или скан рисунка размером до 1 Мб.",
        Field::ArtistV3Photo,
    ),
    ("Методика идентификации базовых эмоций. / Укажите итоговую оценку", Field::EmotionTest),
    (
        "Методика наблюдения за совместной деятельностью. Укажите средние значения результатов экспертного наблюдения по видам деятельности / Планирование",
        Field::Planning,
    ),
    (
        "Методика наблюдения за совместной деятельностью. Укажите средние значения результатов экспертного наблюдения по видам деятельности / Сотрудничество и сотворчество",
        Field::Cooperation,
    ),
    (
        "Методика наблюдения за совместной деятельностью. Укажите средние значения результатов экспертного наблюдения по видам деятельности / Рефлексия",
        Field::Reflection,
    ),
    (
        "При необходимости ниже Вы можете указать свои примечания, либо оставить данное поле пустым.",
        Field::Notes,
    ),
];

pub const TOTAL_LABEL: &str = "Total";

const CAPITAL: &str = "г.Москва";
const UNRANKED_TOWN: u16 = 999;

static HEADER_LOOKUP: Lazy<HashMap<&'static str, Field>> =
    Lazy::new(|| COLUMN_MAPPING.iter().copied().collect());

static FILENAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)-(\d+)").expect("filename pattern is valid"));

static PARENTHESISED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\((.*?)\)").expect("town pattern is valid"));

pub fn lookup_header(header: &str) -> Option<Field> {
    HEADER_LOOKUP.get(header).copied()
}

/// Parses `{site}-{assessment}` from the start of an upload filename, e.g. `5-31-Razvitie.xlsx`.
pub fn parse_filename(filename: &str) -> Result<SourceId> {
    let captures = FILENAME_PATTERN
        .captures(filename)
        .ok_or_else(|| PipelineError::FilenameFormat {
            filename: filename.to_string(),
        })?;

    Ok(SourceId {
        site: captures[1].to_string(),
        assessment: captures[2].to_string(),
    })
}

/// Renames mapped columns to their canonical fields and drops everything else.
///
/// The child code is the only column whose absence fails the run; any other
/// mapped column that is missing reads as an empty cell.
pub fn normalize(table: &RawTable) -> Result<Vec<NormalizedRecord>> {
    let mut columns: Vec<(usize, Field)> = Vec::new();
    for (index, header) in table.headers.iter().enumerate() {
        match lookup_header(header) {
            Some(field) if columns.iter().any(|(_, seen)| *seen == field) => {
                warn!(%field, column = index, "duplicate column ignored");
            }
            Some(field) => columns.push((index, field)),
            None => debug!(header = %header, "unmapped column dropped"),
        }
    }

    if !columns.iter().any(|(_, field)| *field == Field::Code) {
        return Err(PipelineError::MissingColumn { field: Field::Code });
    }

    let records = table
        .rows
        .iter()
        .map(|row| {
            let mut record = NormalizedRecord::default();
            for (index, field) in &columns {
                let value = row.get(*index).cloned().unwrap_or(CellValue::Empty);
                record.set(*field, value);
            }
            record
        })
        .collect::<Vec<_>>();

    debug!(
        mapped = columns.len(),
        rows = records.len(),
        "normalized input table"
    );
    Ok(records)
}

/// Town name from the first parenthesised group of an organization name,
/// cut at the first semicolon.
pub fn extract_town(organization: &str) -> Option<String> {
    let captures = PARENTHESISED.captures(organization)?;
    let town = captures[1].split(';').next().unwrap_or_default().trim();
    Some(town.to_string())
}

pub fn town_sort_key(name: Option<&str>) -> (u16, String) {
    let Some(name) = name else {
        return (UNRANKED_TOWN, String::new());
    };
    let name = name.trim();
    let rank = if name == CAPITAL {
        0
    } else if name.starts_with("г.") {
        1
    } else if ["р.п.", "п.", "пос."].iter().any(|prefix| name.starts_with(prefix)) {
        2
    } else if name.starts_with("с.") {
        3
    } else if name.starts_with("д.") {
        4
    } else if name.starts_with("ст.") {
        5
    } else {
        6
    };
    (rank, name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_of(field: Field) -> String {
        COLUMN_MAPPING
            .iter()
            .find(|(_, mapped)| *mapped == field)
            .map(|(header, _)| header.to_string())
            .unwrap()
    }

    #[test]
    fn mapping_covers_every_field_once() {
        assert_eq!(COLUMN_MAPPING.len(), Field::COUNT);
        assert_eq!(HEADER_LOOKUP.len(), Field::COUNT);
        let mut fields: Vec<Field> = COLUMN_MAPPING.iter().map(|(_, field)| *field).collect();
        fields.sort();
        fields.dedup();
        assert_eq!(fields.len(), Field::COUNT);
    }

    #[test]
    fn parses_site_and_assessment() {
        let id = parse_filename("5-31-Razvitie.xlsx").unwrap();
        assert_eq!(id.site, "5");
        assert_eq!(id.assessment, "31");
        assert_eq!(id.output_filename(), "Analytics_5-31.xlsx");
    }

    #[test]
    fn rejects_filename_without_numeric_prefix() {
        let err = parse_filename("bad.xlsx").unwrap_err();
        assert!(matches!(err, PipelineError::FilenameFormat { .. }));
        assert!(err.to_string().contains("{site}-{assessment}"));
        assert!(parse_filename("x5-31.xlsx").is_err());
        assert!(parse_filename("5_31.xlsx").is_err());
    }

    #[test]
    fn normalize_keeps_only_mapped_columns() {
        let table = RawTable {
            headers: vec![
                header_of(Field::Code),
                "Unrelated column".to_string(),
                header_of(Field::AgeGroup),
            ],
            rows: vec![vec![
                CellValue::Text("A-1".to_string()),
                CellValue::Number(42.0),
                CellValue::Text("5-6 лет".to_string()),
            ]],
        };

        let records = normalize(&table).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].label(Field::Code).as_deref(), Some("A-1"));
        assert_eq!(records[0].label(Field::AgeGroup).as_deref(), Some("5-6 лет"));
        assert_eq!(records[0].get(Field::Planning), &CellValue::Empty);
    }

    #[test]
    fn normalize_tolerates_short_rows() {
        let table = RawTable {
            headers: vec![header_of(Field::Code), header_of(Field::Planning)],
            rows: vec![vec![CellValue::Text("A-2".to_string())]],
        };

        let records = normalize(&table).unwrap();
        assert_eq!(records[0].get(Field::Planning), &CellValue::Empty);
    }

    #[test]
    fn normalize_requires_child_code() {
        let table = RawTable {
            headers: vec![header_of(Field::AgeGroup)],
            rows: vec![],
        };

        let err = normalize(&table).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::MissingColumn { field: Field::Code }
        ));
    }

    #[test]
    fn extracts_town_from_first_parentheses() {
        assert_eq!(
            extract_town("МБДОУ детский сад №5 (г.Тверь; ул. Ленина)").as_deref(),
            Some("г.Тверь")
        );
        assert_eq!(
            extract_town("ГБОУ Школа (г.Москва) (корпус 2)").as_deref(),
            Some("г.Москва")
        );
        assert_eq!(extract_town("Детский сад без адреса"), None);
        assert_eq!(extract_town("Сад ( ; )").as_deref(), Some(""));
    }

    #[test]
    fn town_key_orders_buckets_then_names() {
        let mut towns = vec![
            Some("с.Ивановка"),
            None,
            Some("д.Липки"),
            Some("г.Тверь"),
            Some("пос.Заречный"),
            Some("Хутор"),
            Some("г.Москва"),
            Some("ст.Кавказская"),
            Some("г.Клин"),
            Some("р.п.Сонково"),
        ];
        towns.sort_by_key(|town| town_sort_key(*town));
        assert_eq!(
            towns,
            vec![
                Some("г.Москва"),
                Some("г.Клин"),
                Some("г.Тверь"),
                Some("пос.Заречный"),
                Some("р.п.Сонково"),
                Some("с.Ивановка"),
                Some("д.Липки"),
                Some("ст.Кавказская"),
                Some("Хутор"),
                None,
            ]
        );
    }
}
