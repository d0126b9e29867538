use super::domain::IbgeId;
use super::normalizer::normalize;
use serde::Deserialize;
use std::io::Read;
use std::path::Path;

/// Pins a vacancy row, identified by its state and city as printed on the
/// vacancy page, to a registry municipality when the names do not join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrectionRule {
    pub state_code: String,
    pub city_name: String,
    pub ibge_id: IbgeId,
}

impl CorrectionRule {
    pub fn new(state_code: &str, city_name: &str, ibge_id: &str) -> Self {
        Self {
            state_code: state_code.trim().to_ascii_uppercase(),
            city_name: normalize(city_name.trim()),
            ibge_id: IbgeId::new(ibge_id),
        }
    }

    pub fn matches(&self, state_code: &str, city_name: &str) -> bool {
        self.state_code == state_code && self.city_name == city_name
    }
}

#[derive(Debug, Clone, Default)]
pub struct CorrectionTable {
    rules: Vec<CorrectionRule>,
}

impl CorrectionTable {
    /// Municipalities whose vacancy-page spelling predates an IBGE renaming.
    pub fn builtin() -> Self {
        Self {
            rules: vec![
                CorrectionRule::new("SP", "Embu", "3515004"),
                CorrectionRule::new("RJ", "Parati", "3303807"),
            ],
        }
    }

    pub fn rules(&self) -> &[CorrectionRule] {
        &self.rules
    }

    /// Later rules for the same state and city replace earlier ones.
    pub fn extend(&mut self, rules: impl IntoIterator<Item = CorrectionRule>) {
        for rule in rules {
            self.rules
                .retain(|existing| !existing.matches(&rule.state_code, &rule.city_name));
            self.rules.push(rule);
        }
    }

    pub fn lookup(&self, state_code: &str, city_name: &str) -> Option<&IbgeId> {
        self.rules
            .iter()
            .find(|rule| rule.matches(state_code, city_name))
            .map(|rule| &rule.ibge_id)
    }

    /// Reads operator-supplied rules from CSV with `uf,municipio,ibge_id` headers.
    pub fn read_rules<R: Read>(reader: R) -> Result<Vec<CorrectionRule>, csv::Error> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        csv_reader
            .deserialize::<CorrectionRow>()
            .map(|record| record.map(|row| CorrectionRule::new(&row.uf, &row.municipio, &row.ibge_id)))
            .collect()
    }

    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, csv::Error> {
        let file = std::fs::File::open(path)?;
        self.extend(Self::read_rules(file)?);
        Ok(self)
    }
}

#[derive(Debug, Deserialize)]
struct CorrectionRow {
    uf: String,
    municipio: String,
    ibge_id: String,
}
