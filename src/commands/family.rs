use anyhow::{Result, bail};
use tracing::info;

use docfamily::{DocType, DocumentIdentity, EquipmentQuery, FamilyMatcher};

use crate::cli::{EquipmentArgs, IdentityArgs, MatchMode};

#[derive(Debug, Clone)]
enum Subject {
    Identity(DocumentIdentity),
    Equipment(EquipmentQuery),
}

/// Family a command operates on, resolved from the identity flags.
#[derive(Debug, Clone)]
pub struct FamilyTarget {
    pub doc_type: DocType,
    pub key: String,
    pub matcher: FamilyMatcher,
    pub match_mode: MatchMode,
    subject: Subject,
}

impl FamilyTarget {
    pub fn from_args(
        identity: &IdentityArgs,
        equipment: &EquipmentArgs,
        match_mode: MatchMode,
    ) -> Result<Self> {
        let doc_type = identity.doc_type.doc_type();

        let subject = match equipment.equipment_number.as_deref() {
            Some(equipment_number) => {
                if doc_type != DocType::Mop {
                    bail!("--equipment-number is only valid for MOP documents");
                }
                Subject::Equipment(EquipmentQuery::new(
                    equipment_number,
                    equipment.component_type.as_deref().unwrap_or_default(),
                    &identity.manufacturer,
                    &identity.subject,
                    equipment.date,
                ))
            }
            None => {
                if equipment.component_type.is_some() || equipment.date.is_some() {
                    bail!("--component-type and --date require --equipment-number");
                }
                Subject::Identity(DocumentIdentity::new(
                    &identity.manufacturer,
                    &identity.model,
                    identity.serial.as_deref(),
                    &identity.subject,
                ))
            }
        };

        let (key, matcher) = match (&subject, match_mode) {
            (Subject::Identity(identity), MatchMode::Exact) => {
                (identity.key(), FamilyMatcher::exact(doc_type, identity))
            }
            (Subject::Identity(identity), MatchMode::Legacy) => {
                (identity.key(), FamilyMatcher::legacy(identity))
            }
            (Subject::Equipment(query), MatchMode::Exact) => {
                let key = query.key();
                let matcher = FamilyMatcher::Exact {
                    doc_type,
                    key: key.clone(),
                };
                (key, matcher)
            }
            (Subject::Equipment(query), MatchMode::Legacy) => {
                (query.key(), FamilyMatcher::equipment(query))
            }
        };

        if key.is_empty() {
            bail!("identity fields sanitize to an empty key");
        }

        info!(
            doc_type = %doc_type,
            key = %key,
            match_mode = match_mode.as_str(),
            "resolved document family"
        );

        Ok(Self {
            doc_type,
            key,
            matcher,
            match_mode,
            subject,
        })
    }

    pub fn filename(&self, version: u32, extension: &str) -> String {
        match &self.subject {
            Subject::Identity(identity) => {
                identity.filename_with_extension(self.doc_type, version, extension)
            }
            Subject::Equipment(query) => query.filename_with_extension(version, extension),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::DocTypeArg;

    fn identity_args(doc_type: DocTypeArg) -> IdentityArgs {
        IdentityArgs {
            doc_type,
            manufacturer: "Trane".to_string(),
            model: "CVHE-450".to_string(),
            serial: Some(String::new()),
            subject: "Annual PM".to_string(),
        }
    }

    #[test]
    fn identity_target_builds_key_and_filename() {
        let target = FamilyTarget::from_args(
            &identity_args(DocTypeArg::Mop),
            &EquipmentArgs::default(),
            MatchMode::Exact,
        )
        .expect("target resolves");

        assert_eq!(target.key, "TRANE_CVHE450_ANNUAL_PM");
        assert_eq!(target.filename(3, "html"), "MOP_TRANE_CVHE450_ANNUAL_PM_V3.html");
        assert!(matches!(target.matcher, FamilyMatcher::Exact { .. }));
    }

    #[test]
    fn equipment_target_uses_equipment_tokens() {
        let equipment = EquipmentArgs {
            equipment_number: Some("CH-01".to_string()),
            component_type: Some("Chiller".to_string()),
            date: chrono::NaiveDate::from_ymd_opt(2024, 5, 1),
        };
        let target =
            FamilyTarget::from_args(&identity_args(DocTypeArg::Mop), &equipment, MatchMode::Legacy)
                .expect("target resolves");

        assert_eq!(target.key, "CH01_CHILLER_TRANE_ANNUAL_PM_20240501");
        assert!(matches!(target.matcher, FamilyMatcher::Tokens(ref tokens) if tokens.len() == 5));
        assert_eq!(
            target.filename(2, "html"),
            "MOP_CH01_CHILLER_TRANE_ANNUAL_PM_20240501_V2.html"
        );
    }

    #[test]
    fn invalid_flag_combinations_are_rejected() {
        let equipment = EquipmentArgs {
            equipment_number: Some("CH-01".to_string()),
            ..EquipmentArgs::default()
        };
        assert!(
            FamilyTarget::from_args(&identity_args(DocTypeArg::Eop), &equipment, MatchMode::Exact)
                .is_err()
        );

        let dated = EquipmentArgs {
            date: chrono::NaiveDate::from_ymd_opt(2024, 5, 1),
            ..EquipmentArgs::default()
        };
        assert!(
            FamilyTarget::from_args(&identity_args(DocTypeArg::Mop), &dated, MatchMode::Exact)
                .is_err()
        );

        let mut blank = identity_args(DocTypeArg::Sop);
        blank.manufacturer = "!!".to_string();
        blank.model = String::new();
        blank.subject = " ".to_string();
        assert!(FamilyTarget::from_args(&blank, &EquipmentArgs::default(), MatchMode::Exact).is_err());
    }
}
