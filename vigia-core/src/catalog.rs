//! Closed code sets for the complete blood count profile.

use std::collections::BTreeSet;

/// LOINC code system URI.
pub const LOINC_SYSTEM: &str = "http://loinc.org";

/// Default SES-GO bundle profile ("malote").
pub const DEFAULT_PROFILE_URL: &str =
    "https://fhir.saude.go.gov.br/r4/exame/StructureDefinition/malote";

/// Identifier system for the patient's CPF.
pub const CPF_SYSTEM: &str = "https://fhir.saude.go.gov.br/sid/cpf";

/// Identifier system for the laboratory's CNES.
pub const CNES_SYSTEM: &str = "https://fhir.saude.go.gov.br/sid/cnes";

/// Specimen type code for whole blood (HL7 v2 table 0487).
pub const BLOOD_SPECIMEN_CODE: &str = "BLD";

/// Performer `id` that marks the laboratory performer.
pub const LABORATORY_PERFORMER_ID: &str = "laboratorio";

/// Number of simple exams the panel must reference.
pub const DEFAULT_REQUIRED_ITEM_COUNT: usize = 24;

/// LOINC codes of the hemogram: the CBC panel and its 24 mandatory items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoincCode {
    CbcPanel,

    // Red cell series
    Erythrocytes,
    Hemoglobin,
    Hematocrit,
    Mcv,
    Mch,
    Mchc,
    Rdw,

    // White cell series
    Leukocytes,
    Promyelocytes,
    Myelocytes,
    Metamyelocytes,
    BandNeutrophils,
    SegmentedNeutrophils,
    Monocytes,
    Eosinophils,
    Basophils,
    Lymphocytes,
    AtypicalLymphocytes,
    Prolymphocytes,
    Blasts,

    // Platelets
    Platelets,
    Plateletcrit,
    Mpv,
    Pdw,
}

impl LoincCode {
    /// The 24 simple exams every hemogram must report.
    pub const MANDATORY_ITEMS: [LoincCode; 24] = [
        LoincCode::Erythrocytes,
        LoincCode::Hemoglobin,
        LoincCode::Hematocrit,
        LoincCode::Mcv,
        LoincCode::Mch,
        LoincCode::Mchc,
        LoincCode::Rdw,
        LoincCode::Leukocytes,
        LoincCode::Promyelocytes,
        LoincCode::Myelocytes,
        LoincCode::Metamyelocytes,
        LoincCode::BandNeutrophils,
        LoincCode::SegmentedNeutrophils,
        LoincCode::Monocytes,
        LoincCode::Eosinophils,
        LoincCode::Basophils,
        LoincCode::Lymphocytes,
        LoincCode::AtypicalLymphocytes,
        LoincCode::Prolymphocytes,
        LoincCode::Blasts,
        LoincCode::Platelets,
        LoincCode::Plateletcrit,
        LoincCode::Mpv,
        LoincCode::Pdw,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            LoincCode::CbcPanel => "58410-2",
            LoincCode::Erythrocytes => "789-8",
            LoincCode::Hemoglobin => "718-7",
            LoincCode::Hematocrit => "4544-3",
            LoincCode::Mcv => "787-2",
            LoincCode::Mch => "785-6",
            LoincCode::Mchc => "786-4",
            LoincCode::Rdw => "788-0",
            LoincCode::Leukocytes => "6690-2",
            LoincCode::Promyelocytes => "781-5",
            LoincCode::Myelocytes => "748-4",
            LoincCode::Metamyelocytes => "739-3",
            LoincCode::BandNeutrophils => "763-3",
            LoincCode::SegmentedNeutrophils => "768-2",
            LoincCode::Monocytes => "742-7",
            LoincCode::Eosinophils => "711-2",
            LoincCode::Basophils => "704-7",
            LoincCode::Lymphocytes => "731-0",
            LoincCode::AtypicalLymphocytes => "29262-3",
            LoincCode::Prolymphocytes => "6863-5",
            LoincCode::Blasts => "708-8",
            LoincCode::Platelets => "777-3",
            LoincCode::Plateletcrit => "32266-7",
            LoincCode::Mpv => "32623-1",
            LoincCode::Pdw => "32207-3",
        }
    }

    pub fn display(&self) -> &'static str {
        match self {
            LoincCode::CbcPanel => "CBC panel - Blood by Automated count",
            LoincCode::Erythrocytes => "Erythrocytes",
            LoincCode::Hemoglobin => "Hemoglobin",
            LoincCode::Hematocrit => "Hematocrit",
            LoincCode::Mcv => "MCV",
            LoincCode::Mch => "MCH",
            LoincCode::Mchc => "MCHC",
            LoincCode::Rdw => "RDW",
            LoincCode::Leukocytes => "Leukocytes",
            LoincCode::Promyelocytes => "Promyelocytes",
            LoincCode::Myelocytes => "Myelocytes",
            LoincCode::Metamyelocytes => "Metamyelocytes",
            LoincCode::BandNeutrophils => "Band neutrophils",
            LoincCode::SegmentedNeutrophils => "Segmented neutrophils",
            LoincCode::Monocytes => "Monocytes",
            LoincCode::Eosinophils => "Eosinophils",
            LoincCode::Basophils => "Basophils",
            LoincCode::Lymphocytes => "Lymphocytes",
            LoincCode::AtypicalLymphocytes => "Atypical lymphocytes",
            LoincCode::Prolymphocytes => "Prolymphocytes",
            LoincCode::Blasts => "Blasts",
            LoincCode::Platelets => "Platelets",
            LoincCode::Plateletcrit => "Plateletcrit",
            LoincCode::Mpv => "MPV",
            LoincCode::Pdw => "PDW",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        std::iter::once(LoincCode::CbcPanel)
            .chain(Self::MANDATORY_ITEMS)
            .find(|c| c.code() == code)
    }
}

/// Closed set of item codes a bundle must cover.
///
/// Kept sorted so error messages list codes deterministically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeCatalog {
    mandatory: BTreeSet<String>,
}

impl CodeCatalog {
    pub fn new<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            mandatory: codes.into_iter().map(Into::into).collect(),
        }
    }

    /// Catalog of the 24 hemogram items.
    pub fn complete_blood_count() -> Self {
        Self::new(LoincCode::MANDATORY_ITEMS.iter().map(|c| c.code()))
    }

    pub fn contains(&self, code: &str) -> bool {
        self.mandatory.contains(code)
    }

    pub fn len(&self) -> usize {
        self.mandatory.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mandatory.is_empty()
    }

    pub fn codes(&self) -> &BTreeSet<String> {
        &self.mandatory
    }
}

impl Default for CodeCatalog {
    fn default() -> Self {
        Self::complete_blood_count()
    }
}
