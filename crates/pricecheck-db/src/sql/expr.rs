//! # Expression Fragments
//!
//! Projections, joins and patterns shared by every statement.
//!
//! ## Projection Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Every product statement projects the same columns, whatever the       │
//! │  schema looks like:                                                     │
//! │                                                                         │
//! │  product_id          CAST(p."ptypeid" AS TEXT)   | NULL if no key       │
//! │  product_name        COALESCE(p."pfullname", '')                        │
//! │  product_code        COALESCE(p."pusercode", '') | '' if absent         │
//! │  product_short_code  COALESCE(p."pnamepy", '')   | '' if absent         │
//! │  specification       CAST(p."standard" AS TEXT)  | NULL if absent       │
//! │  price_cents         ROUND(price * 100)::BIGINT                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The product table is always aliased `p`; a joined price table is `pr`.

use pricecheck_core::context::{LookupContext, PriceSource};
use pricecheck_core::{ConfigError, ConfigResult};
use pricecheck_core::{COMPOSITE_FIELDS, COMPOSITE_SEPARATOR, DEFAULT_PRICE_TYPE_ID};

use super::ident::{qualified, quote_ident, quote_table};
use super::StatementBuilder;

// =============================================================================
// Legacy Column Names
// =============================================================================
// Fixed column names on the cross-reference, price and unit tables.

/// Product key on cross-reference, price and unit tables.
pub const LEGACY_PRODUCT_KEY: &str = "ptypeid";
/// Unit id on cross-reference and price tables.
pub const LEGACY_UNIT_ID: &str = "unitid";
/// Price type on the price table.
pub const LEGACY_PRICE_TYPE: &str = "prtypeid";
/// Ordinal on unit and cross-reference tables; doubles as the unit id.
pub const LEGACY_ORDINAL: &str = "ordid";
/// Unit display name on the unit table.
pub const LEGACY_UNIT_NAME: &str = "unit1";
/// Unit conversion rate on the unit table.
pub const LEGACY_UNIT_RATE: &str = "urate";

/// Product table alias.
pub const PRODUCT_ALIAS: &str = "p";

// =============================================================================
// Small Helpers
// =============================================================================

/// `CAST(expr AS TEXT)`.
pub fn as_text(expr: &str) -> String {
    format!("CAST({} AS TEXT)", expr)
}

/// Integer cents from a decimal price expression.
pub fn as_cents(expr: &str) -> String {
    format!("CAST(ROUND(COALESCE({}, 0) * 100) AS BIGINT)", expr)
}

/// `expr ILIKE placeholder ESCAPE '\'`.
pub fn ilike(expr: &str, placeholder: &str) -> String {
    format!("{} ILIKE {} ESCAPE '\\'", expr, placeholder)
}

/// Sort key putting numeric ordinals first, in numeric order.
pub fn numeric_ordinal(expr: &str) -> String {
    let text = as_text(expr);
    format!(
        "CASE WHEN {text} ~ '^[0-9]{{1,18}}$' THEN CAST({text} AS BIGINT) ELSE 9223372036854775807 END",
        text = text
    )
}

/// The product key column on `p`, or a configuration error naming `purpose`.
pub fn product_key(context: &LookupContext, purpose: &str) -> ConfigResult<String> {
    match &context.product_key {
        Some(key) => qualified(PRODUCT_ALIAS, key),
        None => Err(ConfigError::KeyColumnMissing {
            table: context.product_table.to_string(),
            column: LEGACY_PRODUCT_KEY.to_string(),
            purpose: purpose.to_string(),
        }),
    }
}

// =============================================================================
// Projections
// =============================================================================

/// Product id projection; NULL when the key column is absent.
pub fn product_id_expr(context: &LookupContext) -> ConfigResult<String> {
    match &context.product_key {
        Some(key) => Ok(as_text(&qualified(PRODUCT_ALIAS, key)?)),
        None => Ok("CAST(NULL AS TEXT)".to_string()),
    }
}

pub fn product_name_expr(context: &LookupContext) -> ConfigResult<String> {
    let column = qualified(PRODUCT_ALIAS, &context.product_name)?;
    Ok(format!("COALESCE({}, '')", as_text(&column)))
}

/// Text projection that falls back to `''` when the column is absent.
pub fn optional_text_expr(column: Option<&str>) -> ConfigResult<String> {
    match column {
        Some(column) => {
            let column = qualified(PRODUCT_ALIAS, column)?;
            Ok(format!("COALESCE({}, '')", as_text(&column)))
        }
        None => Ok("CAST('' AS TEXT)".to_string()),
    }
}

/// Specification projection; NULL when not present in the schema.
pub fn specification_expr(context: &LookupContext) -> ConfigResult<String> {
    match &context.specification_field {
        Some(field) => Ok(as_text(&qualified(PRODUCT_ALIAS, field)?)),
        None => Ok("CAST(NULL AS TEXT)".to_string()),
    }
}

/// First non-empty barcode field of the product, or `''`.
pub fn preferred_barcode_expr(context: &LookupContext) -> ConfigResult<String> {
    if context.barcode_fields.is_empty() {
        return Ok("CAST('' AS TEXT)".to_string());
    }

    let candidates = context
        .barcode_fields
        .iter()
        .map(|field| Ok(format!("NULLIF({}, '')", as_text(&qualified(PRODUCT_ALIAS, field)?))))
        .collect::<ConfigResult<Vec<_>>>()?;

    Ok(format!("COALESCE({}, '')", candidates.join(", ")))
}

/// The product columns every lookup statement starts with, comma-joined
/// and ending with `price_cents`.
pub fn product_projection(context: &LookupContext, price_expr: &str) -> ConfigResult<String> {
    Ok(format!(
        "{} AS product_id,\n    {} AS product_name,\n    {} AS product_code,\n    {} AS product_short_code,\n    {} AS specification,\n    {} AS price_cents",
        product_id_expr(context)?,
        product_name_expr(context)?,
        optional_text_expr(context.product_code_field.as_deref())?,
        optional_text_expr(context.product_short_code_field.as_deref())?,
        specification_expr(context)?,
        price_expr,
    ))
}

// =============================================================================
// Price
// =============================================================================

/// Price expression plus the join it needs (possibly empty).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceProjection {
    pub expr: String,
    pub join: String,
}

/// Builds the price projection for the current context.
///
/// ## Shapes
/// ```text
/// Column(c)                    p."c"                        (no join)
/// Table, not unit scoped       INNER JOIN price AS pr ON pr.ptypeid = p.key
/// Table, unit scoped           LEFT JOIN LATERAL (... ORDER BY preferred type,
///                              '0001', other ... LIMIT 1) AS pr ON TRUE
/// ```
/// `unit_alias` names a joined cross-reference row whose `unitid` keys the
/// unit-scoped price. Without it the first unit's price of the preferred
/// type is taken.
pub fn price_projection(
    context: &LookupContext,
    builder: &mut StatementBuilder,
    unit_alias: Option<&str>,
) -> ConfigResult<PriceProjection> {
    match &context.price {
        PriceSource::Column(column) => Ok(PriceProjection {
            expr: as_cents(&qualified(PRODUCT_ALIAS, column)?),
            join: String::new(),
        }),

        PriceSource::Table {
            table,
            column,
            unit_scoped: false,
            ..
        } => {
            let key = product_key(context, "Price table join")?;
            Ok(PriceProjection {
                expr: as_cents(&qualified("pr", column)?),
                join: format!(
                    "INNER JOIN {} AS pr ON pr.{} = {}",
                    quote_table(table),
                    quote_ident(LEGACY_PRODUCT_KEY)?,
                    key
                ),
            })
        }

        PriceSource::Table {
            table,
            column,
            unit_scoped: true,
            price_type_id,
        } => {
            let key = product_key(context, "Price table join")?;
            let lateral = unit_scoped_price_lateral(
                builder,
                &quote_table(table),
                column,
                price_type_id,
                &key,
                unit_alias
                    .map(|alias| qualified(alias, LEGACY_UNIT_ID))
                    .transpose()?,
            )?;
            Ok(PriceProjection {
                expr: as_cents("pr.price"),
                join: format!("LEFT JOIN LATERAL (\n{}\n) AS pr ON TRUE", lateral),
            })
        }
    }
}

/// `SELECT price ... LIMIT 1` over a unit-scoped price table, preferring
/// the configured price type, then the default type, then any.
///
/// `unit_expr`, when given, restricts rows to that unit id.
pub fn unit_scoped_price_lateral(
    builder: &mut StatementBuilder,
    quoted_table: &str,
    price_column: &str,
    price_type_id: &str,
    key_expr: &str,
    unit_expr: Option<String>,
) -> ConfigResult<String> {
    let price_type = qualified("pr_raw", LEGACY_PRICE_TYPE)?;
    let unit_id = qualified("pr_raw", LEGACY_UNIT_ID)?;
    let preferred = builder.bind_text(price_type_id);

    let unit_filter = match &unit_expr {
        Some(expr) => format!("\n      AND {} = {}", unit_id, expr),
        None => String::new(),
    };
    let unit_order = match unit_expr {
        Some(_) => String::new(),
        None => format!(", {}", numeric_ordinal(&unit_id)),
    };

    Ok(format!(
        "    SELECT {price} AS price\n    FROM {table} AS pr_raw\n    WHERE {key_col} = {key}{unit_filter}\n    ORDER BY CASE WHEN {ptype} = {preferred} THEN 0 WHEN {ptype} = '{default}' THEN 1 ELSE 2 END, {ptype}{unit_order}\n    LIMIT 1",
        price = qualified("pr_raw", price_column)?,
        table = quoted_table,
        key_col = qualified("pr_raw", LEGACY_PRODUCT_KEY)?,
        key = key_expr,
        unit_filter = unit_filter,
        ptype = price_type,
        preferred = preferred,
        default = DEFAULT_PRICE_TYPE_ID,
        unit_order = unit_order,
    ))
}

// =============================================================================
// Legacy Composite Keyword
// =============================================================================

/// Concatenation of the descriptive columns present in the schema, plus
/// the legacy function's barcode when that path is usable.
///
/// Returns `None` when nothing can be concatenated.
pub fn composite_keyword_expr(context: &LookupContext) -> ConfigResult<Option<String>> {
    let mut parts = Vec::new();

    for field in COMPOSITE_FIELDS {
        if let Some(column) = context.snapshot.column(field) {
            parts.push(format!(
                "COALESCE({}, '')",
                as_text(&qualified(PRODUCT_ALIAS, column)?)
            ));
        }
    }

    if let (Some(function), Some(key)) = (&context.function, &context.product_key) {
        parts.push(format!(
            "COALESCE(CAST({}('B', {}, 0) AS TEXT), '')",
            quote_ident(function)?,
            qualified(PRODUCT_ALIAS, key)?
        ));
    }

    if parts.is_empty() {
        return Ok(None);
    }

    Ok(Some(parts.join(&format!(" || '{}' || ", COMPOSITE_SEPARATOR))))
}

// =============================================================================
// LIKE Patterns
// =============================================================================

/// Escapes `\`, `%` and `_` for use with `ESCAPE '\'`.
pub fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// `%keyword%`, escaped.
pub fn contains_pattern(keyword: &str) -> String {
    format!("%{}%", escape_like(keyword))
}

/// `keyword%`, escaped.
pub fn prefix_pattern(keyword: &str) -> String {
    format!("{}%", escape_like(keyword))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::BindValue;
    use chrono::Utc;
    use pricecheck_core::{DeploymentConfig, SchemaSnapshot};
    use std::sync::Arc;

    fn context_with(config: &DeploymentConfig, columns: &[&str], has_function: bool) -> LookupContext {
        let snapshot = Arc::new(SchemaSnapshot::new(columns.iter().copied(), has_function, Utc::now()));
        LookupContext::resolve(config, snapshot).unwrap()
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(contains_pattern("a_b"), "%a\\_b%");
        assert_eq!(prefix_pattern("692"), "692%");
    }

    #[test]
    fn test_optional_projections() {
        assert_eq!(optional_text_expr(None).unwrap(), "CAST('' AS TEXT)");
        assert_eq!(
            optional_text_expr(Some("pusercode")).unwrap(),
            "COALESCE(CAST(p.\"pusercode\" AS TEXT), '')"
        );
    }

    #[test]
    fn test_column_price_has_no_join() {
        let config = DeploymentConfig::default();
        let context = context_with(&config, &["ptypeid", "pfullname", "RetailPrice"], false);
        let mut builder = StatementBuilder::new();

        let price = price_projection(&context, &mut builder, None).unwrap();
        assert_eq!(
            price.expr,
            "CAST(ROUND(COALESCE(p.\"RetailPrice\", 0) * 100) AS BIGINT)"
        );
        assert!(price.join.is_empty());
    }

    #[test]
    fn test_unit_scoped_price_binds_preferred_type() {
        let mut config = DeploymentConfig::default();
        config.schema.barcode_table = Some("xw_ptypebarcode".to_string());
        config.schema.barcode_column = Some("barcode".to_string());
        config.schema.price_table = Some("xw_p_ptypeprice".to_string());
        config.schema.price_column = Some("price".to_string());
        config.schema.price_type_id = Some("0003".to_string());
        let context = context_with(&config, &["ptypeid", "pfullname"], false);
        let mut builder = StatementBuilder::new();

        let price = price_projection(&context, &mut builder, Some("bc")).unwrap();
        assert!(price.join.starts_with("LEFT JOIN LATERAL"));
        assert!(price.join.contains("pr_raw.\"unitid\" = bc.\"unitid\""));
        assert!(price.join.contains("WHEN pr_raw.\"prtypeid\" = $1 THEN 0"));
        assert!(price.join.contains("= '0001' THEN 1"));

        let statement = builder.finish(String::new());
        assert_eq!(statement.binds, vec![BindValue::Text("0003".to_string())]);
    }

    #[test]
    fn test_plain_price_table_inner_join() {
        let mut config = DeploymentConfig::default();
        config.schema.price_table = Some("public.price_list".to_string());
        config.schema.price_column = Some("amount".to_string());
        let context = context_with(&config, &["ptypeid", "pfullname"], false);
        let mut builder = StatementBuilder::new();

        let price = price_projection(&context, &mut builder, None).unwrap();
        assert_eq!(
            price.join,
            "INNER JOIN \"public\".\"price_list\" AS pr ON pr.\"ptypeid\" = p.\"ptypeid\""
        );
        assert_eq!(price.expr, "CAST(ROUND(COALESCE(pr.\"amount\", 0) * 100) AS BIGINT)");
    }

    #[test]
    fn test_composite_expression() {
        let config = DeploymentConfig::default();
        let context = context_with(
            &config,
            &["ptypeid", "pfullname", "price", "PUserCode", "area"],
            true,
        );

        let expr = composite_keyword_expr(&context).unwrap().unwrap();
        assert_eq!(
            expr,
            "COALESCE(CAST(p.\"PUserCode\" AS TEXT), '') || '^^^' || \
             COALESCE(CAST(p.\"pfullname\" AS TEXT), '') || '^^^' || \
             COALESCE(CAST(p.\"area\" AS TEXT), '') || '^^^' || \
             COALESCE(CAST(\"fn_strunitptype\"('B', p.\"ptypeid\", 0) AS TEXT), '')"
        );
    }

    #[test]
    fn test_composite_skips_function_when_disabled() {
        let mut config = DeploymentConfig::default();
        config.lookup.enable_function_fallback = false;
        let context = context_with(&config, &["ptypeid", "pfullname", "price"], true);

        let expr = composite_keyword_expr(&context).unwrap().unwrap();
        assert!(!expr.contains("fn_strunitptype"));
    }

    #[test]
    fn test_preferred_barcode() {
        let config = DeploymentConfig::default();
        let context = context_with(&config, &["pfullname", "price", "standard", "barcode"], false);
        assert_eq!(
            preferred_barcode_expr(&context).unwrap(),
            "COALESCE(NULLIF(CAST(p.\"standard\" AS TEXT), ''), NULLIF(CAST(p.\"barcode\" AS TEXT), ''), '')"
        );
    }

    #[test]
    fn test_product_id_null_without_key() {
        let config = DeploymentConfig::default();
        let context = context_with(&config, &["pfullname", "price"], false);
        assert_eq!(product_id_expr(&context).unwrap(), "CAST(NULL AS TEXT)");
        assert!(product_key(&context, "test").is_err());
    }
}
