//! Plain-text rendering for the CLI. Amounts are rounded to whole currency
//! units here and nowhere else.

use std::fmt::Write;

use super::{InflationResponse, TaxResponse};

/// Rounds to a whole unit and groups thousands with spaces: `1 234 567`.
pub fn format_money(value: f64) -> String {
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(ch);
    }
    if rounded < 0.0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

fn format_rate(fraction: f64) -> String {
    format!("{:.2}%", fraction * 100.0)
}

pub fn render_tax_text(response: &TaxResponse) -> String {
    let r = &response.result;
    let mut out = String::new();

    let _ = writeln!(out, "Tax year:        {} ({})", response.year, r.scheme_name);
    if (r.gross - r.gross_before_adjustment).abs() > f64::EPSILON {
        let _ = writeln!(
            out,
            "Gross entered:   {}",
            format_money(r.gross_before_adjustment)
        );
    }
    let _ = writeln!(out, "Gross:           {}", format_money(r.gross));
    if let Some(limit) = r.non_taxable_limit {
        let _ = writeln!(out, "Untaxed limit:   {}", format_money(limit));
    }
    let _ = writeln!(out, "Taxable base:    {}", format_money(r.taxable_base));
    let _ = writeln!(out, "Tax:             {}", format_money(r.tax));
    let _ = writeln!(out, "Net:             {}", format_money(r.net));
    let _ = writeln!(out, "Effective rate:  {}", format_rate(r.effective_rate));

    if !r.breakdown.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "{:>14} {:>14} {:>14} {:>8} {:>14}",
            "from", "to", "base", "rate", "tax"
        );
        for row in &r.breakdown {
            let to = row.range_to.map_or_else(|| "-".to_string(), format_money);
            let _ = writeln!(
                out,
                "{:>14} {:>14} {:>14} {:>8} {:>14}",
                format_money(row.range_from),
                to,
                format_money(row.base),
                format_rate(row.rate),
                format_money(row.amount)
            );
        }
    }

    out
}

pub fn render_inflation_text(response: &InflationResponse) -> String {
    let r = &response.result;
    let mut out = String::new();

    let _ = writeln!(out, "Series:      {}", response.series_name);
    let _ = writeln!(
        out,
        "{} in {} prices is {} in {} prices",
        format_money(r.amount),
        r.from_year,
        format_money(r.adjusted),
        r.to_year
    );
    let _ = writeln!(
        out,
        "Difference:  {} ({:+.2}%)",
        format_money(r.difference),
        r.percent_change
    );
    let _ = writeln!(out, "Multiplier:  {:.4}", r.multiplier);

    match &r.series {
        Some(points) => {
            let _ = writeln!(out);
            for point in points {
                let _ = writeln!(out, "{:>6} {:>16}", point.year, format_money(point.value));
            }
        }
        None => {
            let _ = writeln!(
                out,
                "Midpoint:    {} in {}",
                format_money(r.midpoint.value),
                r.midpoint.year
            );
        }
    }

    out
}
