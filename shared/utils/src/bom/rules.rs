//! Per-category cleaning and transformation rules
//!
//! Every category that has business rules is described by one constant
//! [`CategoryRules`]: how its headers are renamed, which schema it must meet,
//! and which normalizations its transformer applies. Cleaners and
//! transformers dispatch on the category through [`rules_for`].

use regex::Regex;

use bomflow_models::schema::{
    ADDITIONAL_INFO, DESIGNATION, ELEMENT, FINISH_QUANTITY, HEIGHT, LENGTH, MATERIAL_SUBTYPE,
    MATERIAL_TYPE, PART_TAG, QUANTITY, USAGE_QUANTITY, WIDTH,
};
use bomflow_models::{BomCategory, Cell, SchemaSpec, PRIMARY_SCHEMA};

use super::validator::RenameMap;

#[derive(Debug)]
pub struct CategoryRules {
    pub category: BomCategory,
    pub renames: &'static RenameMap,
    pub schema: &'static SchemaSpec,
    pub transform: TransformRules,
}

#[derive(Debug)]
pub struct TransformRules {
    /// Swap height and width so that height <= width
    pub order_height_width: bool,
    /// Derive usage from quantity * length / 1000, one decimal
    pub usage_from_length: bool,
    /// Factor applied to the finish quantity before aggregation
    pub finish_multiplier: Option<f64>,
    pub rewrites: &'static [RewriteRule],
}

/// Sets `assign` on rows matching any of `any` and none of `unless`.
#[derive(Debug)]
pub struct RewriteRule {
    pub any: &'static [Condition],
    pub unless: &'static [Condition],
    pub assign: &'static [(&'static str, &'static str)],
}

#[derive(Debug)]
pub struct Condition {
    pub column: &'static str,
    pub pattern: Pattern,
}

/// Case-insensitive text patterns; null cells never match
#[derive(Debug)]
pub enum Pattern {
    Contains(&'static str),
    Regex(&'static str),
}

const fn contains(column: &'static str, needle: &'static str) -> Condition {
    Condition {
        column,
        pattern: Pattern::Contains(needle),
    }
}

const fn regex(column: &'static str, pattern: &'static str) -> Condition {
    Condition {
        column,
        pattern: Pattern::Regex(pattern),
    }
}

pub const PRIMARY_A_RENAMES: &RenameMap = &[
    ("Part Tag", PART_TAG),
    ("Qty", QUANTITY),
    ("Material", MATERIAL_TYPE),
    ("Grade", MATERIAL_SUBTYPE),
    ("Designation", DESIGNATION),
    ("H [mm]", HEIGHT),
    ("W [mm]", WIDTH),
    ("L [mm]", LENGTH),
    ("Total Length [m]", USAGE_QUANTITY),
    ("Surface [m2]", FINISH_QUANTITY),
    ("Element", ELEMENT),
    ("Comment", ADDITIONAL_INFO),
];

pub const PRIMARY_B_RENAMES: &RenameMap = &[
    ("Part Tag", PART_TAG),
    ("Qty", QUANTITY),
    ("Material", MATERIAL_TYPE),
    ("Grade", MATERIAL_SUBTYPE),
    ("Designation", DESIGNATION),
    ("T [mm]", HEIGHT),
    ("W [mm]", WIDTH),
    ("L [mm]", LENGTH),
    ("Area [m2]", USAGE_QUANTITY),
    ("Finish Area [m2]", FINISH_QUANTITY),
    ("Element", ELEMENT),
    ("Comment", ADDITIONAL_INFO),
];

// Rules run in order; a later rule sees the values an earlier one wrote.
const PRIMARY_A_REWRITES: &[RewriteRule] = &[
    RewriteRule {
        any: &[contains(MATERIAL_TYPE, "type-a-x"), contains(MATERIAL_SUBTYPE, "type-a-x")],
        unless: &[],
        assign: &[(MATERIAL_TYPE, "TYPE-A"), (MATERIAL_SUBTYPE, "TYPE-A-X")],
    },
    RewriteRule {
        any: &[contains(MATERIAL_TYPE, "type-a")],
        unless: &[contains(MATERIAL_SUBTYPE, "type-a-x")],
        assign: &[(MATERIAL_TYPE, "TYPE-A"), (MATERIAL_SUBTYPE, "TYPE-A-S")],
    },
    RewriteRule {
        any: &[contains(MATERIAL_TYPE, "type-b")],
        unless: &[],
        assign: &[(MATERIAL_TYPE, "TYPE-B"), (MATERIAL_SUBTYPE, "TYPE-B-S")],
    },
    // bare dimensional stock such as 2x4
    RewriteRule {
        any: &[regex(MATERIAL_TYPE, r"^\d+x\d+$")],
        unless: &[],
        assign: &[(MATERIAL_TYPE, "TYPE-C")],
    },
];

const PRIMARY_B_REWRITES: &[RewriteRule] = &[
    RewriteRule {
        any: &[contains(MATERIAL_TYPE, "composite-a")],
        unless: &[],
        assign: &[(MATERIAL_TYPE, "COMPOSITE-A"), (MATERIAL_SUBTYPE, "COMPOSITE-A-S")],
    },
    RewriteRule {
        any: &[contains(MATERIAL_TYPE, "composite-b")],
        unless: &[],
        assign: &[(MATERIAL_TYPE, "COMPOSITE-B"), (MATERIAL_SUBTYPE, "COMPOSITE-B-S")],
    },
    RewriteRule {
        any: &[contains(MATERIAL_TYPE, "plain")],
        unless: &[],
        assign: &[(MATERIAL_TYPE, "PLAIN")],
    },
    RewriteRule {
        any: &[contains(DESIGNATION, "insert")],
        unless: &[],
        assign: &[(DESIGNATION, "INSERT")],
    },
];

pub static PRIMARY_A_RULES: CategoryRules = CategoryRules {
    category: BomCategory::PrimaryA,
    renames: PRIMARY_A_RENAMES,
    schema: &PRIMARY_SCHEMA,
    transform: TransformRules {
        order_height_width: true,
        usage_from_length: true,
        finish_multiplier: None,
        rewrites: PRIMARY_A_REWRITES,
    },
};

pub static PRIMARY_B_RULES: CategoryRules = CategoryRules {
    category: BomCategory::PrimaryB,
    renames: PRIMARY_B_RENAMES,
    schema: &PRIMARY_SCHEMA,
    transform: TransformRules {
        order_height_width: false,
        usage_from_length: false,
        // finish is measured on one face of a two-faced part
        finish_multiplier: Some(2.0),
        rewrites: PRIMARY_B_REWRITES,
    },
};

/// Rules for a category; `None` where no rules exist yet (secondary) or apply (unclassified).
pub fn rules_for(category: BomCategory) -> Option<&'static CategoryRules> {
    match category {
        BomCategory::PrimaryA => Some(&PRIMARY_A_RULES),
        BomCategory::PrimaryB => Some(&PRIMARY_B_RULES),
        BomCategory::Secondary | BomCategory::Unclassified => None,
    }
}

/// A condition with its regex compiled, ready to test rows
pub(crate) struct CompiledCondition {
    column: usize,
    matcher: Matcher,
}

enum Matcher {
    Contains(String),
    Regex(Regex),
}

impl CompiledCondition {
    /// `None` when the column is not in the table header
    pub(crate) fn compile(condition: &Condition, columns: &[String]) -> Option<Self> {
        let column = columns.iter().position(|c| c == condition.column)?;
        let matcher = match condition.pattern {
            Pattern::Contains(needle) => Matcher::Contains(needle.to_lowercase()),
            Pattern::Regex(pattern) => Matcher::Regex(
                Regex::new(&format!("(?i){}", pattern)).expect("rewrite patterns are valid regexes"),
            ),
        };
        Some(Self { column, matcher })
    }

    pub(crate) fn matches(&self, row: &[Cell]) -> bool {
        let Some(value) = row[self.column].as_str() else {
            return false;
        };
        match &self.matcher {
            Matcher::Contains(needle) => value.to_lowercase().contains(needle.as_str()),
            Matcher::Regex(re) => re.is_match(value),
        }
    }
}
