//! Plain-text and JSON presenters for [`DashboardViews`].
//!
//! Tables are rendered into a `String` so the caller decides where they go
//! (stdout in the binary, a buffer in tests).

use std::fmt::Write as _;

use serde_json::{json, Value};
use subscription_core::formatting::{format_inr, format_number, format_optional, percentage};
use subscription_core::models::SubscriptionRecord;
use subscription_data::aggregator::{CategoryRevenue, PriceSummary};
use subscription_data::analysis::{DashboardViews, ViewWarning};
use subscription_data::crosstab::CrossTab;

const NO_DATA: &str = "No data to display. Try adjusting your filters.";

/// Dashboard sections selectable with `--view`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Overview,
    Customers,
    Plans,
    Cohort,
    Raw,
}

impl Section {
    /// Sections printed for a `--view` value, in display order.
    pub fn for_view(view: &str) -> Vec<Section> {
        match view {
            "overview" => vec![Section::Overview],
            "customers" => vec![Section::Customers],
            "plans" => vec![Section::Plans],
            "cohort" => vec![Section::Cohort],
            "raw" => vec![Section::Raw],
            _ => vec![
                Section::Overview,
                Section::Customers,
                Section::Plans,
                Section::Cohort,
            ],
        }
    }
}

// ── Text table ────────────────────────────────────────────────────────────────

/// Column-aligned text table with an optional totals row.
///
/// The first column is left-aligned; every other column is right-aligned.
#[derive(Debug, Default)]
pub struct TextTable {
    title: String,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    totals: Option<Vec<String>>,
}

impl TextTable {
    pub fn new<I, S>(title: &str, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            title: title.to_string(),
            headers: headers.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn row(&mut self, cells: Vec<String>) -> &mut Self {
        self.rows.push(cells);
        self
    }

    pub fn totals(&mut self, cells: Vec<String>) -> &mut Self {
        self.totals = Some(cells);
        self
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "── {} ──", self.title);

        if self.rows.is_empty() {
            let _ = writeln!(out, "{NO_DATA}");
            return out;
        }

        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for cells in self.rows.iter().chain(self.totals.iter()) {
            for (i, cell) in cells.iter().enumerate() {
                if i < widths.len() {
                    widths[i] = widths[i].max(cell.chars().count());
                }
            }
        }

        push_line(&mut out, &self.headers, &widths);
        let rule_width = widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1);
        let _ = writeln!(out, "{}", "─".repeat(rule_width));
        for cells in &self.rows {
            push_line(&mut out, cells, &widths);
        }
        if let Some(totals) = &self.totals {
            let _ = writeln!(out, "{}", "─".repeat(rule_width));
            push_line(&mut out, totals, &widths);
        }
        out
    }
}

fn push_line(out: &mut String, cells: &[String], widths: &[usize]) {
    let rendered: Vec<String> = widths
        .iter()
        .enumerate()
        .map(|(i, width)| {
            let cell = cells.get(i).map(String::as_str).unwrap_or("");
            let pad = width.saturating_sub(cell.chars().count());
            if i == 0 {
                format!("{cell}{}", " ".repeat(pad))
            } else {
                format!("{}{cell}", " ".repeat(pad))
            }
        })
        .collect();
    let _ = writeln!(out, "{}", rendered.join("  ").trim_end());
}

// ── Sections ──────────────────────────────────────────────────────────────────

/// Render the requested sections of `views` as text.
pub fn render_text(views: &DashboardViews, sections: &[Section], raw: &[&SubscriptionRecord]) -> String {
    let mut out = String::new();
    out.push_str(&render_header(views));

    for section in sections {
        out.push('\n');
        let body = match section {
            Section::Overview => render_overview(views),
            Section::Customers => render_customers(views),
            Section::Plans => render_plans(views),
            Section::Cohort => render_cohort(views),
            Section::Raw => render_raw(raw),
        };
        out.push_str(&body);
    }
    out
}

fn render_header(views: &DashboardViews) -> String {
    let meta = &views.metadata;
    let mut out = format!(
        "Subscription dashboard: {} of {} records selected ({}%)\n",
        format_number(meta.filtered_records as f64, 0),
        format_number(meta.total_records as f64, 0),
        percentage(meta.filtered_records as f64, meta.total_records as f64, 1),
    );
    for warning in &views.warnings {
        let line = match warning {
            ViewWarning::EmptyResult => NO_DATA.to_string(),
            ViewWarning::SkippedRows { count } => {
                format!("{count} invalid row(s) were skipped while loading")
            }
        };
        let _ = writeln!(out, "warning: {line}");
    }
    out
}

fn render_overview(views: &DashboardViews) -> String {
    let kpi = &views.kpi;
    let mut out = String::new();
    let _ = writeln!(out, "── Overview ──");
    let _ = writeln!(out, "Total customers:       {}", format_number(kpi.customers as f64, 0));
    let _ = writeln!(out, "Total revenue:         {}", format_inr(kpi.revenue));
    let _ = writeln!(
        out,
        "Avg subscription value: {}",
        kpi.mean_revenue.map_or_else(|| format_optional(None, 0), format_inr)
    );
    out.push('\n');

    let mut monthly = TextTable::new("Monthly trend", ["Month", "New subscribers", "Revenue"]);
    for point in &views.monthly {
        monthly.row(vec![
            point.month.clone(),
            format_number(point.customers as f64, 0),
            format_inr(point.revenue),
        ]);
    }
    out.push_str(&monthly.render());
    out.push('\n');

    let mut meals = TextTable::new("Meal plan popularity", ["Meal frequency", "Subscriptions", "Share"]);
    let total: usize = views.meal_frequency_counts.iter().map(|c| c.count).sum();
    for entry in &views.meal_frequency_counts {
        meals.row(vec![
            entry.label.clone(),
            format_number(entry.count as f64, 0),
            format!("{}%", percentage(entry.count as f64, total as f64, 1)),
        ]);
    }
    out.push_str(&meals.render());
    out.push('\n');

    out.push_str(&price_summary_table(
        "Order value by meal frequency",
        "Meal frequency",
        &views.price_by_meal_frequency,
    ));
    out
}

fn render_customers(views: &DashboardViews) -> String {
    let mut out = String::new();

    let mut top = TextTable::new(
        &format!("Top {} customers by spend", views.top_customers.len()),
        ["Customer ID", "Customer name", "Total spend"],
    );
    for customer in &views.top_customers {
        top.row(vec![
            customer.customer_id.clone(),
            customer.customer_name.clone(),
            format_inr(customer.total_spend),
        ]);
    }
    out.push_str(&top.render());
    out.push('\n');

    let mut histogram = TextTable::new("Customer spend histogram", ["Price range", "Subscriptions"]);
    for bin in &views.price_histogram {
        histogram.row(vec![
            format!("{} - {}", format_number(bin.lower, 0), format_number(bin.upper, 0)),
            format_number(bin.count as f64, 0),
        ]);
    }
    out.push_str(&histogram.render());
    out
}

fn render_plans(views: &DashboardViews) -> String {
    let mut out = String::new();

    out.push_str(&revenue_table("Revenue by plan type", "Plan type", &views.revenue_by_plan));
    out.push('\n');
    out.push_str(&crosstab_table("Plan type × meal frequency", &views.plan_meal_matrix));
    out.push('\n');

    let mut buckets = TextTable::new("Plan duration segments", ["Duration", "Subscriptions", "Share"]);
    let total: usize = views.duration_buckets.iter().map(|b| b.count).sum();
    if total > 0 {
        for bucket in &views.duration_buckets {
            buckets.row(vec![
                bucket.category.to_string(),
                format_number(bucket.count as f64, 0),
                format!("{}%", percentage(bucket.count as f64, total as f64, 1)),
            ]);
        }
    }
    out.push_str(&buckets.render());
    out.push('\n');

    out.push_str(&revenue_table("Revenue by duration", "Duration", &views.revenue_by_duration));
    out.push('\n');

    let mut combos = TextTable::new("Most popular combinations", ["Plan type", "Meal frequency", "Count"]);
    for combo in &views.top_combinations {
        combos.row(vec![
            combo.plan_type.clone(),
            combo.meal_frequency.clone(),
            format_number(combo.count as f64, 0),
        ]);
    }
    out.push_str(&combos.render());
    out.push('\n');

    out.push_str(&price_summary_table("Order value by plan type", "Plan type", &views.price_by_plan));
    out
}

fn render_cohort(views: &DashboardViews) -> String {
    let mut out = String::new();

    let mut cohorts = TextTable::new("Cohorts by first month", ["Cohort month", "New customers"]);
    for row in &views.cohorts {
        cohorts.row(vec![row.cohort_month.clone(), format_number(row.new_customers as f64, 0)]);
    }
    out.push_str(&cohorts.render());
    out.push('\n');

    let width = views
        .retention
        .first()
        .map_or(0, |row| row.active_by_offset.len());
    let headers = ["Cohort month".to_string(), "Size".to_string()]
        .into_iter()
        .chain((0..width).map(|k| format!("M+{k}")));
    let mut retention = TextTable::new("Retention (% of cohort active)", headers);
    for row in &views.retention {
        let mut cells = vec![row.cohort_month.clone(), format_number(row.new_customers as f64, 0)];
        cells.extend(row.active_by_offset.iter().map(|active| {
            format!("{}%", percentage(*active as f64, row.new_customers as f64, 0))
        }));
        retention.row(cells);
    }
    out.push_str(&retention.render());
    out
}

fn render_raw(records: &[&SubscriptionRecord]) -> String {
    let mut table = TextTable::new(
        "Filtered records",
        [
            "Customer ID",
            "Customer name",
            "Plan type",
            "Meal frequency",
            "Start date",
            "Days",
            "Total price",
            "Duration",
        ],
    );
    for record in records {
        table.row(vec![
            record.customer_id().to_string(),
            record.customer_name().to_string(),
            record.plan_type().to_string(),
            record.meal_frequency().to_string(),
            record.start_date().format("%Y-%m-%d").to_string(),
            record.duration_days().to_string(),
            format_number(record.total_price(), 2),
            record.duration_category().to_string(),
        ]);
    }
    table.render()
}

fn revenue_table(title: &str, label: &str, rows: &[CategoryRevenue]) -> String {
    let mut table = TextTable::new(title, [label, "Revenue"]);
    for row in rows {
        table.row(vec![row.label.clone(), format_inr(row.revenue)]);
    }
    if !rows.is_empty() {
        table.totals(vec![
            "Total".to_string(),
            format_inr(rows.iter().map(|r| r.revenue).sum()),
        ]);
    }
    table.render()
}

fn price_summary_table(title: &str, label: &str, rows: &[PriceSummary]) -> String {
    let mut table = TextTable::new(title, [label, "n", "Min", "Q1", "Median", "Q3", "Max", "Mean"]);
    for s in rows {
        table.row(vec![
            s.label.clone(),
            format_number(s.count as f64, 0),
            format_number(s.min, 0),
            format_number(s.q1, 0),
            format_number(s.median, 0),
            format_number(s.q3, 0),
            format_number(s.max, 0),
            format_number(s.mean, 0),
        ]);
    }
    table.render()
}

fn crosstab_table(title: &str, tab: &CrossTab) -> String {
    let headers = std::iter::once(tab.row_field.to_string())
        .chain(tab.columns.iter().cloned())
        .chain(std::iter::once("Total".to_string()));
    let mut table = TextTable::new(title, headers);

    for ((label, cells), total) in tab.rows.iter().zip(&tab.cells).zip(tab.row_totals()) {
        let mut row = vec![label.clone()];
        row.extend(cells.iter().map(|v| format_number(*v, 0)));
        row.push(format_number(total, 0));
        table.row(row);
    }
    if !tab.is_empty() {
        let mut totals = vec!["Total".to_string()];
        totals.extend(tab.column_totals().into_iter().map(|v| format_number(v, 0)));
        totals.push(format_number(tab.total(), 0));
        table.totals(totals);
    }
    table.render()
}

// ── JSON ──────────────────────────────────────────────────────────────────────

/// JSON document for the requested sections.
///
/// `metadata`, `criteria` and `warnings` are always present.
pub fn render_json(
    views: &DashboardViews,
    sections: &[Section],
    raw: &[&SubscriptionRecord],
) -> serde_json::Result<Value> {
    let mut doc = json!({
        "metadata": views.metadata,
        "criteria": views.criteria,
        "warnings": views.warnings,
    });
    let Some(map) = doc.as_object_mut() else {
        return Ok(doc);
    };

    for section in sections {
        match section {
            Section::Overview => {
                map.insert("kpi".into(), serde_json::to_value(&views.kpi)?);
                map.insert("monthly".into(), serde_json::to_value(&views.monthly)?);
                map.insert(
                    "meal_frequency_counts".into(),
                    serde_json::to_value(&views.meal_frequency_counts)?,
                );
                map.insert(
                    "price_by_meal_frequency".into(),
                    serde_json::to_value(&views.price_by_meal_frequency)?,
                );
            }
            Section::Customers => {
                map.insert("top_customers".into(), serde_json::to_value(&views.top_customers)?);
                map.insert("price_histogram".into(), serde_json::to_value(&views.price_histogram)?);
            }
            Section::Plans => {
                map.insert("revenue_by_plan".into(), serde_json::to_value(&views.revenue_by_plan)?);
                map.insert("plan_meal_matrix".into(), serde_json::to_value(&views.plan_meal_matrix)?);
                map.insert("duration_buckets".into(), serde_json::to_value(&views.duration_buckets)?);
                map.insert(
                    "revenue_by_duration".into(),
                    serde_json::to_value(&views.revenue_by_duration)?,
                );
                map.insert("top_combinations".into(), serde_json::to_value(&views.top_combinations)?);
                map.insert("price_by_plan".into(), serde_json::to_value(&views.price_by_plan)?);
            }
            Section::Cohort => {
                map.insert("cohorts".into(), serde_json::to_value(&views.cohorts)?);
                map.insert("retention".into(), serde_json::to_value(&views.retention)?);
            }
            Section::Raw => {
                map.insert("records".into(), serde_json::to_value(raw)?);
            }
        }
    }
    Ok(doc)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use subscription_data::analysis::{build_dashboard, DashboardOptions};
    use subscription_data::Dataset;

    fn rec(id: &str, plan: &str, meal: &str, date: &str, days: u32, price: f64) -> SubscriptionRecord {
        SubscriptionRecord::new(
            id,
            format!("Customer {id}"),
            plan,
            meal,
            NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            days,
            price,
        )
    }

    fn example() -> Dataset {
        Dataset::new(vec![
            rec("A", "Veg", "Lunch", "2024-01-05", 5, 100.0),
            rec("A", "Keto", "Dinner", "2024-02-10", 20, 300.0),
            rec("B", "Veg", "Dinner", "2024-01-20", 10, 200.0),
        ])
    }

    // ── TextTable ─────────────────────────────────────────────────────────────

    #[test]
    fn test_text_table_aligns_columns() {
        let mut table = TextTable::new("T", ["Name", "Value"]);
        table.row(vec!["a".into(), "1".into()]);
        table.row(vec!["long name".into(), "1,000".into()]);
        let text = table.render();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "── T ──");
        assert_eq!(lines[1], "Name       Value");
        assert_eq!(lines[3], "a              1");
        assert_eq!(lines[4], "long name  1,000");
    }

    #[test]
    fn test_text_table_empty_shows_no_data() {
        let table = TextTable::new("Empty", ["A", "B"]);
        assert!(table.render().contains(NO_DATA));
    }

    #[test]
    fn test_text_table_totals_row() {
        let mut table = TextTable::new("T", ["Label", "N"]);
        table.row(vec!["x".into(), "2".into()]);
        table.totals(vec!["Total".into(), "2".into()]);
        let text = table.render();
        assert_eq!(text.lines().last(), Some("Total  2"));
    }

    // ── Section selection ─────────────────────────────────────────────────────

    #[test]
    fn test_section_for_view() {
        assert_eq!(Section::for_view("cohort"), vec![Section::Cohort]);
        assert_eq!(Section::for_view("all").len(), 4);
        assert!(!Section::for_view("all").contains(&Section::Raw));
    }

    // ── render_text ───────────────────────────────────────────────────────────

    #[test]
    fn test_render_text_overview_kpis() {
        let ds = example();
        let views = build_dashboard(&ds, &ds.default_criteria(), &DashboardOptions::default()).unwrap();
        let text = render_text(&views, &[Section::Overview], &[]);
        assert!(text.contains("3 of 3 records selected (100%)"));
        assert!(text.contains("Total revenue:         ₹600"));
        assert!(text.contains("2024-01"));
    }

    #[test]
    fn test_render_text_empty_selection() {
        let ds = example();
        let mut criteria = ds.default_criteria();
        criteria.meal_frequencies.clear();
        let views = build_dashboard(&ds, &criteria, &DashboardOptions::default()).unwrap();

        let text = render_text(&views, &Section::for_view("all"), &[]);
        assert!(text.contains("warning: No data to display"));
        assert!(text.contains("Avg subscription value: n/a"));
        // Cohorts still render from the full dataset.
        assert!(text.contains("── Cohorts by first month ──"));
        assert!(text.contains("M+1"));
    }

    #[test]
    fn test_render_text_plans_crosstab_totals() {
        let ds = example();
        let views = build_dashboard(&ds, &ds.default_criteria(), &DashboardOptions::default()).unwrap();
        let text = render_text(&views, &[Section::Plans], &[]);
        assert!(text.contains("Plan_Type"));
        assert!(text.contains("8-15 days"));
    }

    #[test]
    fn test_render_text_raw() {
        let ds = example();
        let selected: Vec<&SubscriptionRecord> = ds.records().iter().collect();
        let views = build_dashboard(&ds, &ds.default_criteria(), &DashboardOptions::default()).unwrap();
        let text = render_text(&views, &[Section::Raw], &selected);
        assert!(text.contains("Customer B"));
        assert!(text.contains("2024-02-10"));
    }

    // ── render_json ───────────────────────────────────────────────────────────

    #[test]
    fn test_render_json_selects_sections() {
        let ds = example();
        let views = build_dashboard(&ds, &ds.default_criteria(), &DashboardOptions::default()).unwrap();

        let doc = render_json(&views, &[Section::Cohort], &[]).unwrap();
        assert_eq!(doc["cohorts"][0]["cohort_month"], "2024-01");
        assert_eq!(doc["cohorts"][0]["new_customers"], 2);
        assert!(doc.get("kpi").is_none());
        assert_eq!(doc["metadata"]["total_records"], 3);
    }

    #[test]
    fn test_render_json_overview() {
        let ds = example();
        let views = build_dashboard(&ds, &ds.default_criteria(), &DashboardOptions::default()).unwrap();
        let doc = render_json(&views, &[Section::Overview], &[]).unwrap();
        assert_eq!(doc["kpi"]["customers"], 2);
        assert_eq!(doc["monthly"][1]["month"], "2024-02");
    }
}
