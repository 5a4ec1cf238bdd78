//! # Statements
//!
//! Complete SELECT statements for introspection, the four lookup paths,
//! unit listing and fragment search.
//!
//! ## Statement Catalog
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  product_columns        information_schema.columns for product table    │
//! │  function_exists        pg_proc on the search path                      │
//! │  barcode_table_lookup   cross-reference row = candidate (LIMIT 1)       │
//! │  field_lookup           p."field" = candidate (LIMIT 1)                 │
//! │  function_lookup        fn('B', p.key, 0) = candidate (LIMIT 1)         │
//! │  composite_lookup       composite ILIKE %kw%, prefix first (LIMIT 1)    │
//! │  units_for_product      units + per-unit price + barcode list           │
//! │  search_fragment        UNION ALL over targets, ranked, dedup, LIMIT    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use pricecheck_core::context::{LookupContext, PriceSource};
use pricecheck_core::search::{SearchTarget, SearchTargetKind};
use pricecheck_core::validation::TableRef;
use pricecheck_core::ConfigResult;

use super::expr::{
    as_cents, as_text, composite_keyword_expr, contains_pattern, ilike, numeric_ordinal,
    prefix_pattern, preferred_barcode_expr, price_projection, product_key, product_projection,
    unit_scoped_price_lateral, LEGACY_ORDINAL, LEGACY_PRODUCT_KEY, LEGACY_UNIT_ID,
    LEGACY_UNIT_NAME, LEGACY_UNIT_RATE, PRODUCT_ALIAS,
};
use super::ident::{qualified, quote_table};
use super::{SqlStatement, StatementBuilder};

// =============================================================================
// Introspection
// =============================================================================

/// Column names of the product table, in ordinal order.
pub fn product_columns(table: &TableRef) -> SqlStatement {
    let mut builder = StatementBuilder::new();
    let schema_filter = match table.schema() {
        Some(schema) => builder.bind_text(schema),
        None => "current_schema()".to_string(),
    };
    let name = builder.bind_text(table.name());

    let sql = format!(
        "SELECT CAST(column_name AS TEXT) AS column_name\n\
         FROM information_schema.columns\n\
         WHERE table_schema = {}\n  AND table_name = {}\n\
         ORDER BY ordinal_position",
        schema_filter, name
    );
    builder.finish(sql)
}

/// Whether a function with this exact name is visible on the search path.
pub fn function_exists(name: &str) -> SqlStatement {
    let mut builder = StatementBuilder::new();
    let name = builder.bind_text(name.trim());

    let sql = format!(
        "SELECT EXISTS (\n    SELECT 1\n    FROM pg_proc AS f\n    \
         INNER JOIN pg_namespace AS n ON n.oid = f.pronamespace\n    \
         WHERE f.proname = {}\n      AND n.nspname = ANY(current_schemas(false))\n) AS present",
        name
    );
    builder.finish(sql)
}

// =============================================================================
// Exact Lookups
// =============================================================================

/// Exact match on the barcode cross-reference table.
///
/// Returns `None` when the cross-reference path is not usable.
pub fn barcode_table_lookup(
    context: &LookupContext,
    candidate: &str,
) -> ConfigResult<Option<SqlStatement>> {
    let barcode_table = match &context.barcode_table {
        Some(barcode_table) => barcode_table,
        None => return Ok(None),
    };

    let mut builder = StatementBuilder::new();
    let price = price_projection(context, &mut builder, Some("bc"))?;
    let barcode = qualified("bc", &barcode_table.column)?;
    let value = builder.bind_text(candidate);

    let sql = format!(
        "SELECT\n    {projection},\n    {unit_id} AS matched_unit_id,\n    {matched} AS matched_barcode\n\
         FROM {xref} AS bc\n\
         INNER JOIN {product} AS p ON {xref_key} = {key}\n\
         {price_join}\n\
         WHERE {barcode} = {value}\n\
         LIMIT 1",
        projection = product_projection(context, &price.expr)?,
        unit_id = as_text(&qualified("bc", LEGACY_UNIT_ID)?),
        matched = as_text(&barcode),
        xref = quote_table(&barcode_table.table),
        product = quote_table(&context.product_table),
        xref_key = qualified("bc", LEGACY_PRODUCT_KEY)?,
        key = product_key(context, "Barcode table join")?,
        price_join = price.join,
        barcode = as_text(&barcode),
        value = value,
    );
    Ok(Some(builder.finish(sql)))
}

/// Exact match on one barcode column of the product table.
pub fn field_lookup(
    context: &LookupContext,
    field: &str,
    candidate: &str,
) -> ConfigResult<SqlStatement> {
    let mut builder = StatementBuilder::new();
    let price = price_projection(context, &mut builder, None)?;
    let value = builder.bind_text(candidate);

    let sql = format!(
        "SELECT\n    {projection},\n    CAST(NULL AS TEXT) AS matched_unit_id,\n    CAST({value} AS TEXT) AS matched_barcode\n\
         FROM {product} AS p\n\
         {price_join}\n\
         WHERE {field} = {value}\n\
         LIMIT 1",
        projection = product_projection(context, &price.expr)?,
        product = quote_table(&context.product_table),
        price_join = price.join,
        field = as_text(&qualified(PRODUCT_ALIAS, field)?),
        value = value,
    );
    Ok(builder.finish(sql))
}

/// Exact match on the legacy function's derived barcode.
///
/// Returns `None` when the function path is not usable.
pub fn function_lookup(
    context: &LookupContext,
    candidate: &str,
) -> ConfigResult<Option<SqlStatement>> {
    let function = match &context.function {
        Some(function) => function,
        None => return Ok(None),
    };

    let mut builder = StatementBuilder::new();
    let price = price_projection(context, &mut builder, None)?;
    let value = builder.bind_text(candidate);

    let sql = format!(
        "SELECT\n    {projection},\n    CAST(NULL AS TEXT) AS matched_unit_id,\n    CAST({value} AS TEXT) AS matched_barcode\n\
         FROM {product} AS p\n\
         {price_join}\n\
         WHERE CAST({function}('B', {key}, 0) AS TEXT) = {value}\n\
         LIMIT 1",
        projection = product_projection(context, &price.expr)?,
        product = quote_table(&context.product_table),
        price_join = price.join,
        function = super::ident::quote_ident(function)?,
        key = product_key(context, "Legacy function lookup")?,
        value = value,
    );
    Ok(Some(builder.finish(sql)))
}

// =============================================================================
// Legacy Composite Keyword
// =============================================================================

/// Fuzzy match on the composite keyword; a prefix match ranks first.
///
/// Returns `None` when no composite column exists.
pub fn composite_lookup(
    context: &LookupContext,
    keyword: &str,
) -> ConfigResult<Option<SqlStatement>> {
    let composite = match composite_keyword_expr(context)? {
        Some(composite) => composite,
        None => return Ok(None),
    };

    let mut builder = StatementBuilder::new();
    let price = price_projection(context, &mut builder, None)?;
    let keyword_value = builder.bind_text(keyword);
    let contains = builder.bind_text(contains_pattern(keyword));
    let prefix = builder.bind_text(prefix_pattern(keyword));

    let tie_break = match &context.product_key {
        Some(key) => qualified(PRODUCT_ALIAS, key)?,
        None => qualified(PRODUCT_ALIAS, &context.product_name)?,
    };

    let sql = format!(
        "SELECT\n    {projection},\n    CAST(NULL AS TEXT) AS matched_unit_id,\n    CAST({keyword} AS TEXT) AS matched_barcode\n\
         FROM {product} AS p\n\
         {price_join}\n\
         WHERE {contains_match}\n\
         ORDER BY CASE WHEN {prefix_match} THEN 0 ELSE 1 END, {tie_break}\n\
         LIMIT 1",
        projection = product_projection(context, &price.expr)?,
        keyword = keyword_value,
        product = quote_table(&context.product_table),
        price_join = price.join,
        contains_match = ilike(&format!("({})", composite), &contains),
        prefix_match = ilike(&format!("({})", composite), &prefix),
        tie_break = tie_break,
    );
    Ok(Some(builder.finish(sql)))
}

// =============================================================================
// Units
// =============================================================================

/// Units of a product with their price, barcode list and matched flag.
///
/// Returns `None` unless the cross-reference table, a price table and the
/// unit table are all usable.
pub fn units_for_product(
    context: &LookupContext,
    product_id: &str,
    matched_barcode: &str,
) -> ConfigResult<Option<SqlStatement>> {
    let (barcode_table, unit_table) = match (&context.barcode_table, &context.unit_table) {
        (Some(barcode_table), Some(unit_table)) => (barcode_table, unit_table),
        _ => return Ok(None),
    };
    let (price_table, price_column, price_type_id) = match &context.price {
        PriceSource::Table {
            table,
            column,
            price_type_id,
            ..
        } => (table, column, price_type_id),
        PriceSource::Column(_) => return Ok(None),
    };

    let mut builder = StatementBuilder::new();
    let product_value = builder.bind_text(product_id);
    let matched_value = builder.bind_text(matched_barcode);

    let xref = quote_table(&barcode_table.table);
    let unit_key = qualified("u", LEGACY_PRODUCT_KEY)?;
    let unit_ordinal = qualified("u", LEGACY_ORDINAL)?;

    let price_lateral = unit_scoped_price_lateral(
        &mut builder,
        &quote_table(price_table),
        price_column,
        price_type_id,
        &unit_key,
        Some(unit_ordinal.clone()),
    )?;

    let sql = format!(
        "SELECT\n    \
         {unit_id} AS unit_id,\n    \
         COALESCE({unit_name}, '') AS unit_name,\n    \
         COALESCE({unit_rate}, '0') AS unit_rate,\n    \
         {price} AS price_cents,\n    \
         bc.barcode_list AS barcode_list,\n    \
         EXISTS (\n        SELECT 1\n        FROM {xref} AS m\n        \
         WHERE {m_key} = {unit_key}\n          AND {m_unit} = {unit_ordinal}\n          AND {m_barcode} = {matched}\n    \
         ) AS is_matched_unit\n\
         FROM {units} AS u\n\
         LEFT JOIN LATERAL (\n{price_lateral}\n) AS pr ON TRUE\n\
         LEFT JOIN LATERAL (\n    \
         SELECT string_agg({bc_barcode}, ',' ORDER BY {bc_order}, {bc_ordinal_text}) AS barcode_list\n    \
         FROM {xref} AS bc_raw\n    \
         WHERE {bc_key} = {unit_key}\n      AND {bc_unit} = {unit_ordinal}\n\
         ) AS bc ON TRUE\n\
         WHERE {unit_key_text} = {product}\n\
         ORDER BY {unit_order}, {unit_id}",
        unit_id = format!("COALESCE({}, '')", as_text(&unit_ordinal)),
        unit_name = as_text(&qualified("u", LEGACY_UNIT_NAME)?),
        unit_rate = as_text(&qualified("u", LEGACY_UNIT_RATE)?),
        price = as_cents("pr.price"),
        xref = xref,
        m_key = qualified("m", LEGACY_PRODUCT_KEY)?,
        m_unit = qualified("m", LEGACY_UNIT_ID)?,
        m_barcode = as_text(&qualified("m", &barcode_table.column)?),
        matched = matched_value,
        unit_key = unit_key,
        unit_ordinal = unit_ordinal,
        units = quote_table(unit_table),
        price_lateral = price_lateral,
        bc_barcode = as_text(&qualified("bc_raw", &barcode_table.column)?),
        bc_order = numeric_ordinal(&qualified("bc_raw", LEGACY_ORDINAL)?),
        bc_ordinal_text = as_text(&qualified("bc_raw", LEGACY_ORDINAL)?),
        bc_key = qualified("bc_raw", LEGACY_PRODUCT_KEY)?,
        bc_unit = qualified("bc_raw", LEGACY_UNIT_ID)?,
        unit_key_text = as_text(&unit_key),
        product = product_value,
        unit_order = numeric_ordinal(&unit_ordinal),
    );
    Ok(Some(builder.finish(sql)))
}

// =============================================================================
// Fragment Search
// =============================================================================

/// Fragment search over the given targets.
///
/// Each target contributes one `UNION ALL` branch tagged with its
/// `field_rank` (position) and `match_rank` (0 prefix, 1 contains). The
/// best row per product survives; rows without a product id are all kept.
/// Output is ordered by `(match_rank, field_rank, barcode)` and limited.
///
/// Returns `None` when there are no targets.
pub fn search_fragment(
    context: &LookupContext,
    targets: &[SearchTarget],
    keyword: &str,
    limit: usize,
) -> ConfigResult<Option<SqlStatement>> {
    if targets.is_empty() {
        return Ok(None);
    }

    let mut builder = StatementBuilder::new();
    let contains = builder.bind_text(contains_pattern(keyword));
    let prefix = builder.bind_text(prefix_pattern(keyword));

    let cross_reference = context.barcode_table.as_ref();
    let price = price_projection(context, &mut builder, cross_reference.map(|_| "bc"))?;
    let projection = product_projection(context, &price.expr)?;

    let from = match cross_reference {
        Some(barcode_table) => format!(
            "FROM {} AS bc\n    INNER JOIN {} AS p ON {} = {}\n    {}",
            quote_table(&barcode_table.table),
            quote_table(&context.product_table),
            qualified("bc", LEGACY_PRODUCT_KEY)?,
            product_key(context, "Barcode table join")?,
            price.join
        ),
        None => format!(
            "FROM {} AS p\n    {}",
            quote_table(&context.product_table),
            price.join
        ),
    };

    let preferred_barcode = preferred_barcode_expr(context)?;
    let mut branches = Vec::with_capacity(targets.len());

    for (rank, target) in targets.iter().enumerate() {
        let target_expr = match target.kind {
            SearchTargetKind::CrossReference => as_text(&qualified("bc", &target.column)?),
            SearchTargetKind::BarcodeField | SearchTargetKind::Descriptive => {
                as_text(&qualified(PRODUCT_ALIAS, &target.column)?)
            }
        };

        let barcode_expr = match (target.kind, cross_reference) {
            (SearchTargetKind::BarcodeField, _) => target_expr.clone(),
            (_, Some(barcode_table)) => as_text(&qualified("bc", &barcode_table.column)?),
            (_, None) => preferred_barcode.clone(),
        };

        let label = builder.bind_text(target.label.as_str());

        branches.push(format!(
            "    SELECT\n    {projection},\n    \
             {barcode} AS barcode,\n    \
             CAST({label} AS TEXT) AS matched_by,\n    \
             CASE WHEN {prefix_match} THEN 0 ELSE 1 END AS match_rank,\n    \
             {rank} AS field_rank\n    \
             {from}\n    \
             WHERE {contains_match}\n      \
             AND NULLIF(TRIM({barcode}), '') IS NOT NULL",
            projection = projection,
            barcode = barcode_expr,
            label = label,
            prefix_match = ilike(&target_expr, &prefix),
            rank = rank,
            from = from,
            contains_match = ilike(&target_expr, &contains),
        ));
    }

    let limit_value = builder.bind_int(limit as i64);

    let sql = format!(
        "WITH raw AS (\n{branches}\n),\n\
         ranked AS (\n    \
         SELECT raw.*,\n        \
         ROW_NUMBER() OVER (\n            \
         PARTITION BY product_id\n            \
         ORDER BY match_rank, field_rank, barcode\n        \
         ) AS dedup_rank\n    \
         FROM raw\n\
         )\n\
         SELECT product_id, product_name, product_code, product_short_code, specification,\n       \
         price_cents, barcode, matched_by, match_rank, field_rank\n\
         FROM ranked\n\
         WHERE product_id IS NULL OR dedup_rank = 1\n\
         ORDER BY match_rank, field_rank, barcode\n\
         LIMIT {limit}",
        branches = branches.join("\n    UNION ALL\n"),
        limit = limit_value,
    );
    Ok(Some(builder.finish(sql)))
}

// =============================================================================
// Unit Tests
// =============================================================================
