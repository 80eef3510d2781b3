//! Plain-text tables for terminal output.

use crash_warehouse_etl_models::{LoadSummary, QualityReport};
use crash_warehouse_mining::models::{MiningReport, format_items};
use crash_warehouse_olap::models::QueryResult;

/// Label printed in rolled-up grouping columns.
const ALL_LABEL: &str = "(all)";

fn print_table(headers: &[String], rows: &[Vec<String>]) {
    let mut widths: Vec<usize> = headers.iter().map(String::len).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }
    let line = |cells: &[String]| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, &width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join("  ")
    };
    println!("{}", line(headers));
    println!("{}", "-".repeat(widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1)));
    for row in rows {
        println!("{}", line(row));
    }
}

pub fn print_query(result: &QueryResult) {
    let rows: Vec<Vec<String>> = result
        .rows
        .iter()
        .map(|row| {
            row.values
                .iter()
                .map(|v| v.as_ref().map_or_else(|| ALL_LABEL.to_string(), ToString::to_string))
                .chain([
                    row.total_crashes.to_string(),
                    row.total_fatalities.to_string(),
                    format!("{:.2}", row.fatality_rate_per_100),
                ])
                .collect()
        })
        .collect();
    print_table(&result.headers(), &rows);
    println!("({} rows)", result.rows.len());
}

pub fn print_mining(report: &MiningReport, top: Option<usize>) {
    println!(
        "{} transactions, {} frequent itemsets, {} rules",
        report.transactions,
        report.itemsets.len(),
        report.rules.len()
    );
    let limit = top.unwrap_or(usize::MAX);

    println!();
    let rows: Vec<Vec<String>> = report
        .itemsets
        .iter()
        .take(limit)
        .map(|set| {
            vec![
                format_items(&set.items),
                set.count.to_string(),
                format!("{:.4}", set.support),
            ]
        })
        .collect();
    print_table(
        &["itemset".to_string(), "count".to_string(), "support".to_string()],
        &rows,
    );

    println!();
    let rows: Vec<Vec<String>> = report
        .rules
        .iter()
        .take(limit)
        .map(|rule| {
            vec![
                format_items(&rule.antecedent),
                format_items(&rule.consequent),
                format!("{:.4}", rule.support),
                format!("{:.4}", rule.confidence),
                format!("{:.4}", rule.lift),
            ]
        })
        .collect();
    print_table(
        &[
            "antecedent".to_string(),
            "consequent".to_string(),
            "support".to_string(),
            "confidence".to_string(),
            "lift".to_string(),
        ],
        &rows,
    );
}

pub fn print_summary(summary: &LoadSummary) {
    println!("Records read:   {}", summary.records_read);
    println!("Facts inserted: {}", summary.facts_inserted);
    println!("Filtered:       {}", summary.filtered);
    println!("Rejected:       {}", summary.rejected_count());
    println!("Sentineled:     {}", summary.sentineled.len());
    for (table, rows) in &summary.dimension_rows {
        println!("  {table:<28} {rows}");
    }
}

pub fn print_quality(report: &QualityReport) {
    let rows: Vec<Vec<String>> = report
        .table_rows
        .iter()
        .map(|(table, rows)| {
            let count = |map: &std::collections::BTreeMap<String, usize>| {
                map.get(table).map_or_else(|| "-".to_string(), ToString::to_string)
            };
            vec![
                table.clone(),
                rows.to_string(),
                count(&report.sentinel_references),
                count(&report.dangling_references),
            ]
        })
        .collect();
    print_table(
        &[
            "table".to_string(),
            "rows".to_string(),
            "unknown refs".to_string(),
            "dangling refs".to_string(),
        ],
        &rows,
    );

    for (label, map) in [
        ("Rejected", &report.rejected_by_field),
        ("Sentineled", &report.sentineled_by_field),
    ] {
        for (field, count) in map {
            println!("{label} for {field}: {count}");
        }
    }
    if !report.season_labels.is_empty() {
        println!();
        for (raw, clean) in &report.season_labels {
            println!("season {raw:?} -> {clean}");
        }
    }
    println!();
    if report.referentially_intact() {
        println!("Referential integrity: OK");
    } else {
        println!("Referential integrity: FAILED");
    }
}
