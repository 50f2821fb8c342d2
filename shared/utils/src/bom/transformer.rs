//! BOM Transformers
//!
//! Projects a cleaned BOM to the business columns, applies its category's
//! normalizations and collapses duplicate rows.

use bomflow_models::schema::{FINISH_QUANTITY, HEIGHT, LENGTH, QUANTITY, USAGE_QUANTITY, WIDTH};
use bomflow_models::{BomCategory, Cell, Table, BUSINESS_COLUMNS, GROUP_KEY_COLUMNS, SUM_COLUMNS};

use super::aggregate::aggregate_rows;
use super::cleaner::CleanedBom;
use super::coercer::whole_number;
use super::rules::{rules_for, CompiledCondition, RewriteRule, TransformRules};
use crate::error::{BomError, BomResult, ValidationError};

const STAGE: &str = "transform";

pub fn transform_bom(cleaned: CleanedBom) -> BomResult<Table> {
    tracing::debug!(category = %cleaned.category, "Starting transformation");

    let transformed = match rules_for(cleaned.category) {
        Some(rules) => transform_with_rules(&cleaned.table, &rules.transform)?,
        None if cleaned.category == BomCategory::Secondary => cleaned.table,
        None => return Err(BomError::unclassifiable(cleaned.category.as_str())),
    };

    tracing::debug!(
        category = %cleaned.category,
        rows = transformed.row_count(),
        "Transformed BOM"
    );
    Ok(transformed)
}

fn transform_with_rules(table: &Table, rules: &TransformRules) -> BomResult<Table> {
    let mut table = table
        .select(&BUSINESS_COLUMNS)
        .map_err(|column| ValidationError::missing_column(STAGE, vec![column]))?;

    for column in [HEIGHT, WIDTH, LENGTH] {
        round_dimension(&mut table, column)?;
    }

    if rules.usage_from_length {
        derive_usage_from_length(&mut table)?;
    }

    if rules.order_height_width {
        order_height_width(&mut table);
    }

    if let Some(factor) = rules.finish_multiplier {
        table.map_column(FINISH_QUANTITY, |cell| match cell {
            Cell::Float(value) => Cell::Float(value * factor),
            Cell::Int(value) => Cell::Float(*value as f64 * factor),
            other => other.clone(),
        });
    }

    apply_rewrites(&mut table, rules.rewrites);

    aggregate_rows(&table, &GROUP_KEY_COLUMNS, &SUM_COLUMNS)
}

/// Round half to even, matching the spreadsheet tooling the BOMs come from.
fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round_ties_even() / scale
}

fn round_dimension(table: &mut Table, column: &str) -> BomResult<()> {
    let mut failure = None;
    table.map_column(column, |cell| match rounded_dimension(cell) {
        Ok(Some(value)) => Cell::Int(value),
        Ok(None) => {
            failure.get_or_insert_with(|| "missing dimension".to_string());
            Cell::Null
        }
        Err(reason) => {
            failure.get_or_insert(reason);
            Cell::Null
        }
    });

    match failure {
        Some(reason) => Err(BomError::type_conversion(column, "integer", reason)),
        None => Ok(()),
    }
}

fn rounded_dimension(cell: &Cell) -> Result<Option<i64>, String> {
    match cell.as_f64()? {
        Some(value) => whole_number(round_to(value, 0)).map(Some),
        None => Ok(None),
    }
}

/// usage = quantity * length / 1000, rounded to one decimal
fn derive_usage_from_length(table: &mut Table) -> BomResult<()> {
    let (Some(q), Some(l)) = (table.column_index(QUANTITY), table.column_index(LENGTH)) else {
        return Err(ValidationError::missing_column(STAGE, vec![QUANTITY.into(), LENGTH.into()]).into());
    };

    let usage = table
        .rows()
        .iter()
        .map(|row| {
            let quantity = row[q].as_f64().map_err(|r| BomError::type_conversion(QUANTITY, "number", r))?;
            let length = row[l].as_f64().map_err(|r| BomError::type_conversion(LENGTH, "number", r))?;
            Ok(match (quantity, length) {
                (Some(quantity), Some(length)) => Cell::Float(round_to(quantity * length / 1000.0, 1)),
                _ => Cell::Null,
            })
        })
        .collect::<BomResult<Vec<_>>>()?;

    table.set_column(USAGE_QUANTITY, usage);
    Ok(())
}

/// Canonical orientation: the smaller of height and width is the height.
fn order_height_width(table: &mut Table) {
    let (Some(h), Some(w)) = (table.column_index(HEIGHT), table.column_index(WIDTH)) else {
        return;
    };

    for row in table.rows_mut() {
        if let (Cell::Int(height), Cell::Int(width)) = (&row[h], &row[w]) {
            if height > width {
                row.swap(h, w);
            }
        }
    }
}

/// Apply vocabulary rewrites in order, row by row.
fn apply_rewrites(table: &mut Table, rewrites: &[RewriteRule]) {
    let columns = table.columns().to_vec();
    let compiled: Vec<CompiledRewrite> = rewrites
        .iter()
        .map(|rule| CompiledRewrite::compile(rule, &columns))
        .collect();

    for row in table.rows_mut() {
        for rule in &compiled {
            if rule.matches(row) {
                for (idx, value) in &rule.assign {
                    row[*idx] = Cell::text(*value);
                }
            }
        }
    }
}

struct CompiledRewrite {
    any: Vec<CompiledCondition>,
    unless: Vec<CompiledCondition>,
    assign: Vec<(usize, &'static str)>,
}

impl CompiledRewrite {
    fn compile(rule: &RewriteRule, columns: &[String]) -> Self {
        Self {
            any: rule.any.iter().filter_map(|c| CompiledCondition::compile(c, columns)).collect(),
            unless: rule.unless.iter().filter_map(|c| CompiledCondition::compile(c, columns)).collect(),
            assign: rule
                .assign
                .iter()
                .filter_map(|(column, value)| columns.iter().position(|c| c == column).map(|i| (i, *value)))
                .collect(),
        }
    }

    fn matches(&self, row: &[Cell]) -> bool {
        self.any.iter().any(|c| c.matches(row)) && !self.unless.iter().any(|c| c.matches(row))
    }
}
