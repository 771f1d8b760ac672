use serde::{Deserialize, Deserializer};
use std::io::Read;

#[derive(Debug)]
pub(crate) struct SheetRecord {
    pub(crate) line: u64,
    pub(crate) responsibility_id: String,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) weight: u8,
    pub(crate) self_score: Option<String>,
    pub(crate) supervisor_score_1: Option<String>,
    pub(crate) supervisor_score_2: Option<String>,
}

pub(crate) fn parse_records<R: Read>(reader: R) -> Result<Vec<SheetRecord>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut records = Vec::new();

    for (index, record) in csv_reader.deserialize::<SheetRow>().enumerate() {
        let row = record?;
        records.push(SheetRecord {
            // header occupies line 1
            line: index as u64 + 2,
            responsibility_id: row.responsibility_id,
            title: row.title,
            description: row.description.unwrap_or_default(),
            weight: row.weight,
            self_score: row.self_score,
            supervisor_score_1: row.supervisor_score_1,
            supervisor_score_2: row.supervisor_score_2,
        });
    }

    Ok(records)
}

#[derive(Debug, Deserialize)]
struct SheetRow {
    #[serde(rename = "Responsibility ID")]
    responsibility_id: String,
    #[serde(rename = "Title")]
    title: String,
    #[serde(
        rename = "Description",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    description: Option<String>,
    #[serde(rename = "Weight")]
    weight: u8,
    #[serde(
        rename = "Self Score",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    self_score: Option<String>,
    #[serde(
        rename = "Supervisor Score 1",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    supervisor_score_1: Option<String>,
    #[serde(
        rename = "Supervisor Score 2",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    supervisor_score_2: Option<String>,
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}
