use serde::{Deserialize, Serialize};
use std::fmt;

/// Government (IBGE) municipality code; the only join key trusted across sources.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IbgeId(pub String);

impl IbgeId {
    pub fn new(raw: &str) -> Self {
        Self(raw.trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IbgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Profession {
    #[default]
    #[serde(alias = "medicina")]
    Medicine,
    #[serde(alias = "enfermagem")]
    Nursing,
    #[serde(alias = "farmacia", alias = "farmácia")]
    Pharmacy,
    #[serde(alias = "fisioterapia")]
    Physiotherapy,
}

impl Profession {
    pub const fn ordered() -> [Self; 4] {
        [
            Self::Medicine,
            Self::Nursing,
            Self::Pharmacy,
            Self::Physiotherapy,
        ]
    }

    /// Column header used by the vacancy page, also shown to users.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Medicine => "Medicina",
            Self::Nursing => "Enfermagem",
            Self::Pharmacy => "Farmácia",
            Self::Physiotherapy => "Fisioterapia",
        }
    }

    pub const fn slug(self) -> &'static str {
        match self {
            Self::Medicine => "medicine",
            Self::Nursing => "nursing",
            Self::Pharmacy => "pharmacy",
            Self::Physiotherapy => "physiotherapy",
        }
    }

    const fn index(self) -> usize {
        match self {
            Self::Medicine => 0,
            Self::Nursing => 1,
            Self::Pharmacy => 2,
            Self::Physiotherapy => 3,
        }
    }
}

/// Open vacancies per profession for one city.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Openings([u32; 4]);

impl Openings {
    pub fn get(&self, profession: Profession) -> u32 {
        self.0[profession.index()]
    }

    pub fn set(&mut self, profession: Profession, count: u32) {
        self.0[profession.index()] = count;
    }

    pub fn with(mut self, profession: Profession, count: u32) -> Self {
        self.set(profession, count);
        self
    }
}

/// A municipality known to both the registry and the coordinates table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityRecord {
    pub ibge_id: IbgeId,
    pub city_name: String,
    pub state_code: String,
    pub coordinates: Coordinates,
    pub population: Option<u64>,
}

/// One row of the vacancy page with its registry and coordinate matches resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VacancyListing {
    pub state_code: String,
    pub city_name_raw: String,
    pub city_name: String,
    pub openings: Openings,
    pub ibge_id: IbgeId,
    pub coordinates: Coordinates,
}

/// Inputs collected from one dashboard interaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    pub city: Option<String>,
    pub state: Option<String>,
    pub profession: Profession,
    pub max_distance_km: Option<u32>,
    pub show_table: bool,
}

impl FilterState {
    pub fn for_profession(profession: Profession) -> Self {
        Self {
            profession,
            ..Self::default()
        }
    }

    pub fn with_origin(mut self, city: impl Into<String>, state: impl Into<String>) -> Self {
        self.city = Some(city.into());
        self.state = Some(state.into());
        self
    }

    pub fn with_max_distance(mut self, km: u32) -> Self {
        self.max_distance_km = Some(km);
        self
    }

    /// Both origin fields trimmed, or `None` when either is blank.
    pub fn origin_query(&self) -> Option<(&str, &str)> {
        let city = self.city.as_deref().map(str::trim).filter(|v| !v.is_empty())?;
        let state = self.state.as_deref().map(str::trim).filter(|v| !v.is_empty())?;
        Some((city, state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profession_accepts_english_and_portuguese_names() {
        let parsed: Vec<Profession> =
            serde_json::from_str(r#"["nursing","medicina","farmácia","fisioterapia"]"#)
                .expect("professions parse");
        assert_eq!(
            parsed,
            vec![
                Profession::Nursing,
                Profession::Medicine,
                Profession::Pharmacy,
                Profession::Physiotherapy
            ]
        );
    }

    #[test]
    fn openings_are_tracked_per_profession() {
        let openings = Openings::default()
            .with(Profession::Nursing, 3)
            .with(Profession::Pharmacy, 1);
        assert_eq!(openings.get(Profession::Medicine), 0);
        assert_eq!(openings.get(Profession::Nursing), 3);
        assert_eq!(openings.get(Profession::Pharmacy), 1);
    }

    #[test]
    fn blank_origin_fields_mean_no_origin() {
        let state = FilterState::for_profession(Profession::Medicine).with_origin("  ", "AC");
        assert!(state.origin_query().is_none());

        let state = FilterState::for_profession(Profession::Medicine).with_origin(" Rio Branco ", "ac");
        assert_eq!(state.origin_query(), Some(("Rio Branco", "ac")));
    }
}
