//! Tag-keyed camera metadata.
//!
//! The calibration constants and the default scene
//! parameters are read from the image metadata under their
//! ExifTool tag names. [`CameraMetadata`] holds the subset
//! the conversion needs, and is filled either by serde from
//! `exiftool -j -b` output, or from the FLIR camera
//! parameter record of an R-JPEG.

use serde_derive::*;

/// Metadata tags consumed by the conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetadataTag {
    Emissivity,
    ObjectDistance,
    ReflectedApparentTemperature,
    AtmosphericTemperature,
    RelativeHumidity,
    PlanckR1,
    PlanckB,
    PlanckF,
    PlanckO,
    PlanckR2,
    AtmosphericTransAlpha1,
    AtmosphericTransAlpha2,
    AtmosphericTransBeta1,
    AtmosphericTransBeta2,
    AtmosphericTransX,
}

impl MetadataTag {
    pub const ALL: [MetadataTag; 15] = [
        MetadataTag::Emissivity,
        MetadataTag::ObjectDistance,
        MetadataTag::ReflectedApparentTemperature,
        MetadataTag::AtmosphericTemperature,
        MetadataTag::RelativeHumidity,
        MetadataTag::PlanckR1,
        MetadataTag::PlanckB,
        MetadataTag::PlanckF,
        MetadataTag::PlanckO,
        MetadataTag::PlanckR2,
        MetadataTag::AtmosphericTransAlpha1,
        MetadataTag::AtmosphericTransAlpha2,
        MetadataTag::AtmosphericTransBeta1,
        MetadataTag::AtmosphericTransBeta2,
        MetadataTag::AtmosphericTransX,
    ];

    /// The ExifTool tag name.
    pub fn name(self) -> &'static str {
        use MetadataTag::*;
        match self {
            Emissivity => "Emissivity",
            ObjectDistance => "ObjectDistance",
            ReflectedApparentTemperature => "ReflectedApparentTemperature",
            AtmosphericTemperature => "AtmosphericTemperature",
            RelativeHumidity => "RelativeHumidity",
            PlanckR1 => "PlanckR1",
            PlanckB => "PlanckB",
            PlanckF => "PlanckF",
            PlanckO => "PlanckO",
            PlanckR2 => "PlanckR2",
            AtmosphericTransAlpha1 => "AtmosphericTransAlpha1",
            AtmosphericTransAlpha2 => "AtmosphericTransAlpha2",
            AtmosphericTransBeta1 => "AtmosphericTransBeta1",
            AtmosphericTransBeta2 => "AtmosphericTransBeta2",
            AtmosphericTransX => "AtmosphericTransX",
        }
    }
}

impl std::fmt::Display for MetadataTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A metadata value as found in the image.
#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    Number(f64),
    /// Text that does not begin with a number, kept verbatim.
    Unparseable(String),
}

/// Calibration and scene values read from image metadata.
///
/// Values that ExifTool prints with a unit (`"15.0 C"`,
/// `"1.00 m"`, `"75.0 %"`) are parsed by their leading
/// number. A tag absent from the metadata stays `None`; a
/// tag whose text carries no number is kept as
/// [`TagValue::Unparseable`] so callers can report it, or
/// replace it, per tag.
#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct CameraMetadata {
    #[serde(default, deserialize_with = "serde_helpers::float_with_unit")]
    emissivity: Option<TagValue>,
    #[serde(default, deserialize_with = "serde_helpers::float_with_unit")]
    object_distance: Option<TagValue>,
    #[serde(default, deserialize_with = "serde_helpers::float_with_unit")]
    reflected_apparent_temperature: Option<TagValue>,
    #[serde(default, deserialize_with = "serde_helpers::float_with_unit")]
    atmospheric_temperature: Option<TagValue>,
    #[serde(default, deserialize_with = "serde_helpers::float_with_unit")]
    relative_humidity: Option<TagValue>,

    #[serde(default, deserialize_with = "serde_helpers::float_with_unit")]
    planck_r1: Option<TagValue>,
    #[serde(default, deserialize_with = "serde_helpers::float_with_unit")]
    planck_b: Option<TagValue>,
    #[serde(default, deserialize_with = "serde_helpers::float_with_unit")]
    planck_f: Option<TagValue>,
    #[serde(default, deserialize_with = "serde_helpers::float_with_unit")]
    planck_o: Option<TagValue>,
    #[serde(default, deserialize_with = "serde_helpers::float_with_unit")]
    planck_r2: Option<TagValue>,

    #[serde(
        rename = "AtmosphericTransAlpha1",
        default,
        deserialize_with = "serde_helpers::float_with_unit"
    )]
    atmospheric_trans_alpha_1: Option<TagValue>,
    #[serde(
        rename = "AtmosphericTransAlpha2",
        default,
        deserialize_with = "serde_helpers::float_with_unit"
    )]
    atmospheric_trans_alpha_2: Option<TagValue>,
    #[serde(
        rename = "AtmosphericTransBeta1",
        default,
        deserialize_with = "serde_helpers::float_with_unit"
    )]
    atmospheric_trans_beta_1: Option<TagValue>,
    #[serde(
        rename = "AtmosphericTransBeta2",
        default,
        deserialize_with = "serde_helpers::float_with_unit"
    )]
    atmospheric_trans_beta_2: Option<TagValue>,
    #[serde(
        rename = "AtmosphericTransX",
        default,
        deserialize_with = "serde_helpers::float_with_unit"
    )]
    atmospheric_trans_x: Option<TagValue>,
}

impl CameraMetadata {
    /// Look up the numeric value of a tag.
    pub fn get(&self, tag: MetadataTag) -> Option<f64> {
        match self.slot(tag) {
            Some(TagValue::Number(val)) => Some(*val),
            _ => None,
        }
    }

    /// The value of a tag, including unparseable text.
    pub fn value(&self, tag: MetadataTag) -> Option<&TagValue> {
        self.slot(tag).as_ref()
    }

    pub fn set(&mut self, tag: MetadataTag, value: f64) {
        *self.slot_mut(tag) = Some(TagValue::Number(value));
    }

    /// Builder form of [`set`][Self::set].
    pub fn with(mut self, tag: MetadataTag, value: f64) -> Self {
        self.set(tag, value);
        self
    }

    /// Tags with no numeric value.
    pub fn missing(&self) -> impl Iterator<Item = MetadataTag> + '_ {
        MetadataTag::ALL
            .iter()
            .copied()
            .filter(move |&tag| self.get(tag).is_none())
    }

    fn slot(&self, tag: MetadataTag) -> &Option<TagValue> {
        use MetadataTag::*;
        match tag {
            Emissivity => &self.emissivity,
            ObjectDistance => &self.object_distance,
            ReflectedApparentTemperature => &self.reflected_apparent_temperature,
            AtmosphericTemperature => &self.atmospheric_temperature,
            RelativeHumidity => &self.relative_humidity,
            PlanckR1 => &self.planck_r1,
            PlanckB => &self.planck_b,
            PlanckF => &self.planck_f,
            PlanckO => &self.planck_o,
            PlanckR2 => &self.planck_r2,
            AtmosphericTransAlpha1 => &self.atmospheric_trans_alpha_1,
            AtmosphericTransAlpha2 => &self.atmospheric_trans_alpha_2,
            AtmosphericTransBeta1 => &self.atmospheric_trans_beta_1,
            AtmosphericTransBeta2 => &self.atmospheric_trans_beta_2,
            AtmosphericTransX => &self.atmospheric_trans_x,
        }
    }

    fn slot_mut(&mut self, tag: MetadataTag) -> &mut Option<TagValue> {
        use MetadataTag::*;
        match tag {
            Emissivity => &mut self.emissivity,
            ObjectDistance => &mut self.object_distance,
            ReflectedApparentTemperature => &mut self.reflected_apparent_temperature,
            AtmosphericTemperature => &mut self.atmospheric_temperature,
            RelativeHumidity => &mut self.relative_humidity,
            PlanckR1 => &mut self.planck_r1,
            PlanckB => &mut self.planck_b,
            PlanckF => &mut self.planck_f,
            PlanckO => &mut self.planck_o,
            PlanckR2 => &mut self.planck_r2,
            AtmosphericTransAlpha1 => &mut self.atmospheric_trans_alpha_1,
            AtmosphericTransAlpha2 => &mut self.atmospheric_trans_alpha_2,
            AtmosphericTransBeta1 => &mut self.atmospheric_trans_beta_1,
            AtmosphericTransBeta2 => &mut self.atmospheric_trans_beta_2,
            AtmosphericTransX => &mut self.atmospheric_trans_x,
        }
    }
}

mod serde_helpers {
    use lazy_static::lazy_static;
    use regex::Regex;
    use serde::*;
    use serde_derive::*;

    use super::TagValue;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrText {
        Number(f64),
        Text(String),
    }

    pub fn float_with_unit<'de, D>(de: D) -> Result<Option<TagValue>, D::Error>
    where
        D: Deserializer<'de>,
    {
        lazy_static! {
            static ref RE: Regex =
                Regex::new(r"^\s*[-+]?(\d+\.?\d*|\.\d+)([eE][-+]?\d+)?").unwrap();
        }

        let str_rep = match NumberOrText::deserialize(de)? {
            NumberOrText::Number(val) => return Ok(Some(TagValue::Number(val))),
            NumberOrText::Text(s) => s,
        };

        let parsed: Option<f64> = RE
            .find(&str_rep)
            .and_then(|m| m.as_str().trim().parse().ok());
        Ok(Some(match parsed {
            Some(val) => TagValue::Number(val),
            None => TagValue::Unparseable(str_rep),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_values_with_units() {
        let meta: CameraMetadata = serde_json::from_str(
            r#"{
                "Emissivity": 0.95,
                "ObjectDistance": "1.00 m",
                "ReflectedApparentTemperature": "-4.5 C",
                "AtmosphericTemperature": "20.0 C",
                "RelativeHumidity": "50.0 %",
                "PlanckR2": "1.2545e-2",
                "AtmosphericTransX": 1.9,
                "Make": "FLIR"
            }"#,
        )
        .unwrap();

        assert_eq!(meta.get(MetadataTag::Emissivity), Some(0.95));
        assert_eq!(meta.get(MetadataTag::ObjectDistance), Some(1.0));
        assert_eq!(meta.get(MetadataTag::ReflectedApparentTemperature), Some(-4.5));
        assert_eq!(meta.get(MetadataTag::AtmosphericTemperature), Some(20.0));
        assert_eq!(meta.get(MetadataTag::RelativeHumidity), Some(50.0));
        assert_eq!(meta.get(MetadataTag::PlanckR2), Some(1.2545e-2));
        assert_eq!(meta.get(MetadataTag::AtmosphericTransX), Some(1.9));
        assert_eq!(meta.get(MetadataTag::PlanckB), None);
    }

    #[test]
    fn keeps_text_without_number() {
        let meta: CameraMetadata =
            serde_json::from_str(r#"{ "RelativeHumidity": "n/a", "PlanckB": 1428.0 }"#).unwrap();
        assert_eq!(meta.get(MetadataTag::RelativeHumidity), None);
        assert_eq!(
            meta.value(MetadataTag::RelativeHumidity),
            Some(&TagValue::Unparseable("n/a".into()))
        );
        assert_eq!(meta.get(MetadataTag::PlanckB), Some(1428.0));
        assert!(meta.missing().any(|tag| tag == MetadataTag::RelativeHumidity));
    }

    #[test]
    fn lists_missing_tags() {
        let mut meta = CameraMetadata::default();
        for tag in MetadataTag::ALL.iter().copied() {
            if tag != MetadataTag::PlanckO {
                meta.set(tag, 1.0);
            }
        }
        assert_eq!(meta.missing().collect::<Vec<_>>(), vec![MetadataTag::PlanckO]);
    }
}
