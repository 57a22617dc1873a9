//! # costmerge-cli
//!
//! Command-line front end for costmerge: inspect a spreadsheet, merge a cost
//! sheet into an order sheet, preview and edit the result, and export it.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use costmerge_core::{
    detect_anchor_column, suggest_key_column, suggest_value_column, MatchFilter, MergeColumns, MergeSession,
    MergeStats, Page, RowId, SearchField, Slot, ViewQuery, DEFAULT_PAGE_SIZE,
};
use costmerge_sheet::{collect_headers, field, CellValue, ExportFormat, Record, DEFAULT_BATCH_SIZE};
use costmerge_worker::{ExportedFile, JobClient, JobId};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Widest cell shown in the preview table
const MAX_CELL_WIDTH: usize = 24;

/// costmerge - merge a cost sheet into an order sheet
#[derive(Parser)]
#[command(name = "costmerge")]
#[command(author, version, about = "Merge a cost sheet into an order sheet", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Show the columns, row count and suggested merge columns of a file
    Inspect {
        /// Spreadsheet to inspect (.xlsx, .xls, .ods, .csv)
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Merge a cost file into an order file and export the result
    Merge(MergeArgs),
}

#[derive(Args)]
struct MergeArgs {
    /// Cost spreadsheet
    #[arg(long, value_name = "FILE")]
    cost: PathBuf,

    /// Order spreadsheet
    #[arg(long, value_name = "FILE")]
    order: PathBuf,

    /// Key column of the cost sheet (default: suggested from column names)
    #[arg(long)]
    cost_key: Option<String>,

    /// Key column of the order sheet (default: suggested from column names)
    #[arg(long)]
    order_key: Option<String>,

    /// Cost column copied into every order row (default: suggested)
    #[arg(long)]
    value: Option<String>,

    /// Export format (xlsx, csv)
    #[arg(short = 'f', long, default_value = "csv")]
    format: ExportFormat,

    /// Output file or directory (default: timestamped name in the current directory)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Rows per encoder batch
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    /// Preview filter (all, matched, unmatched)
    #[arg(long, default_value = "all")]
    filter: MatchFilter,

    /// Only preview rows containing this text
    #[arg(long)]
    search: Option<String>,

    /// Restrict the search to a field group (all, product-name, merchant-code, sub-order-id)
    #[arg(long, default_value = "all")]
    search_field: SearchField,

    /// Preview page, starting at 1
    #[arg(long, default_value_t = 1)]
    page: usize,

    /// Rows per preview page
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    page_size: usize,

    /// Set the cost value of a merged row before export (row numbers start at 1)
    #[arg(long = "set", value_name = "ROW=VALUE")]
    edits: Vec<String>,

    /// Preview only, do not write an export file
    #[arg(long)]
    no_export: bool,

    /// Print statistics and preview as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
            .with_writer(std::io::stderr)
            .init();
    }

    match cli.command {
        Command::Inspect { file, json } => inspect(&file, json).await,
        Command::Merge(args) => run_merge(args).await,
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("Failed to read file: {}", path.display()))
}

// ============================================================================
// inspect
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InspectReport {
    file: String,
    rows: usize,
    columns: Vec<String>,
    suggested_key: Option<String>,
    suggested_value: Option<String>,
    anchor_column: Option<String>,
}

impl InspectReport {
    fn new(file: &Path, records: &[Record]) -> Self {
        let columns = collect_headers(records);
        let names = || columns.iter().map(String::as_str);
        let anchor = records
            .first()
            .and_then(|first| detect_anchor_column(first.keys().map(String::as_str)))
            .map(str::to_string);

        Self {
            file: file.display().to_string(),
            rows: records.len(),
            suggested_key: suggest_key_column(names()).map(str::to_string),
            suggested_value: suggest_value_column(names()).map(str::to_string),
            anchor_column: anchor,
            columns,
        }
    }
}

async fn inspect(path: &Path, json: bool) -> Result<()> {
    let bytes = read_file(path)?;
    let client = JobClient::spawn();
    let decoded = client.decode(JobId::generate(), bytes).await;
    client.shutdown();

    let sheet = decoded.with_context(|| format!("Failed to decode {}", path.display()))?;
    let report = InspectReport::new(path, &sheet.data);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{} {}", "File:".cyan().bold(), report.file);
    println!("{} {}", "Rows:".cyan().bold(), report.rows);
    println!("{} ({})", "Columns".cyan().bold(), report.columns.len());
    for (idx, column) in report.columns.iter().enumerate() {
        println!("  {:>3}. {column}", idx + 1);
    }
    println!();
    print_suggestion("Key column", report.suggested_key.as_deref());
    print_suggestion("Cost column", report.suggested_value.as_deref());
    print_suggestion("Anchor column", report.anchor_column.as_deref());
    Ok(())
}

fn print_suggestion(label: &str, column: Option<&str>) {
    match column {
        Some(column) => println!("{} {}", format!("{label}:").cyan(), column.green()),
        None => println!("{} {}", format!("{label}:").cyan(), "(none)".dimmed()),
    }
}

// ============================================================================
// merge
// ============================================================================

async fn run_merge(args: MergeArgs) -> Result<()> {
    let cost_bytes = read_file(&args.cost)?;
    let order_bytes = read_file(&args.order)?;

    let client = JobClient::spawn();
    let outcome = merge_files(&client, args, cost_bytes, order_bytes).await;
    client.shutdown();
    outcome
}

async fn merge_files(client: &JobClient, args: MergeArgs, cost_bytes: Vec<u8>, order_bytes: Vec<u8>) -> Result<()> {
    let (cost, order) = tokio::join!(
        client.decode(JobId::from("cost_file"), cost_bytes),
        client.decode(JobId::from("order_file"), order_bytes),
    );
    let cost = cost.with_context(|| format!("Failed to decode cost file {}", args.cost.display()))?;
    let order = order.with_context(|| format!("Failed to decode order file {}", args.order.display()))?;

    let mut session = MergeSession::new();
    session.load(Slot::Cost, cost.data);
    session.load(Slot::Order, order.data);
    if let Some(column) = args.cost_key {
        session.set_cost_key(column);
    }
    if let Some(column) = args.order_key {
        session.set_order_key(column);
    }
    if let Some(column) = args.value {
        session.set_value_column(column);
    }

    let request = session
        .merge_request()
        .context("Cannot merge; choose columns with --cost-key, --order-key and --value")?;
    let result = client
        .merge(JobId::generate(), request.cost, request.order, request.columns)
        .await
        .context("Merge failed")?;
    session.apply_result(result);

    for edit in &args.edits {
        let (row, value) = parse_edit(edit)?;
        session
            .update_value(row, value)
            .with_context(|| format!("Cannot apply edit '{edit}'"))?;
    }

    let exported = if args.no_export {
        None
    } else {
        let data = session.result().map(<[Record]>::to_vec).unwrap_or_default();
        let (dir, requested_name) = output_target(args.output.as_deref());
        let file = client
            .export(JobId::generate(), data, requested_name, args.format, Some(args.batch_size))
            .await
            .context("Export failed")?;
        let path = dir.join(&file.file_name);
        std::fs::write(&path, &file.data).with_context(|| format!("Failed to write {}", path.display()))?;
        Some((path, file))
    };

    let query = ViewQuery {
        filter: args.filter,
        search: args.search.unwrap_or_default(),
        search_field: args.search_field,
        page: args.page,
        page_size: args.page_size,
    };
    let page = session.view(&query)?;

    if args.json {
        let report = MergeReport::new(&session, &page, exported.as_ref());
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_stats(&session);
    println!();
    let headers = session.result().map(collect_headers).unwrap_or_default();
    print!("{}", render_table(&headers, &page));
    println!(
        "{}",
        format!(
            "Page {}/{} ({} rows)",
            page.page,
            page.page_count.max(1),
            page.filtered_total
        )
        .dimmed()
    );

    if let Some((path, file)) = &exported {
        println!();
        println!(
            "{} {} ({} rows, {})",
            "Exported".green().bold(),
            path.display(),
            file.row_count,
            file.format
        );
    }

    Ok(())
}

/// Parse a `ROW=VALUE` edit. Rows are numbered from 1 as in the preview.
fn parse_edit(edit: &str) -> Result<(RowId, CellValue)> {
    let (row, value) = edit
        .split_once('=')
        .with_context(|| format!("Invalid edit '{edit}'. Expected ROW=VALUE format"))?;
    let row: usize = row
        .trim()
        .parse()
        .with_context(|| format!("Invalid row number in edit '{edit}'"))?;
    if row == 0 {
        bail!("Invalid edit '{edit}': row numbers start at 1");
    }
    Ok((RowId(row - 1), CellValue::parse(value)))
}

/// Directory to write into and the file name to ask the exporter for.
fn output_target(output: Option<&Path>) -> (PathBuf, Option<String>) {
    match output {
        None => (PathBuf::new(), None),
        Some(path) if path.is_dir() => (path.to_path_buf(), None),
        Some(path) => (
            path.parent().map(Path::to_path_buf).unwrap_or_default(),
            path.file_name().map(|name| name.to_string_lossy().into_owned()),
        ),
    }
}

fn print_stats(session: &MergeSession) {
    let MergeStats {
        cost_count,
        order_count,
        total,
        matched_count,
        unmatched_count,
    } = session.stats();

    println!("{}", "Merge result".cyan().bold());
    println!("  Cost rows:   {cost_count}");
    println!("  Order rows:  {order_count}");
    println!("  Merged:      {total}");
    println!("  Matched:     {}", matched_count.to_string().green());
    if unmatched_count == 0 {
        println!("  Unmatched:   0");
    } else {
        println!("  Unmatched:   {}", unmatched_count.to_string().yellow());
    }

    let columns = session.columns();
    println!("  Keys:        {} = {} -> {}", columns.cost_key, columns.order_key, columns.value);
    match session.anchor_column() {
        Some(anchor) => println!("  Placed:      after '{anchor}'"),
        None => println!("  Placed:      appended"),
    }
}

/// Render a preview page as a plain text table with a leading row number.
fn render_table(headers: &[String], page: &Page<'_>) -> String {
    if page.rows.is_empty() {
        return "(no rows)\n".to_string();
    }

    let mut grid: Vec<Vec<String>> = Vec::with_capacity(page.rows.len() + 1);
    grid.push(std::iter::once("#".to_string()).chain(headers.iter().cloned()).collect());
    for (row_id, record) in &page.rows {
        grid.push(
            std::iter::once((row_id.index() + 1).to_string())
                .chain(headers.iter().map(|h| truncate(&field(record, h).as_str())))
                .collect(),
        );
    }

    let widths: Vec<usize> = (0..=headers.len())
        .map(|col| grid.iter().map(|row| row[col].chars().count()).max().unwrap_or(0))
        .collect();

    let mut out = String::new();
    for (idx, row) in grid.iter().enumerate() {
        let line = row
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{cell}{}", " ".repeat(width - cell.chars().count())))
            .collect::<Vec<_>>()
            .join("  ");
        out.push_str(line.trim_end());
        out.push('\n');
        if idx == 0 {
            let rule = widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join("  ");
            out.push_str(&rule);
            out.push('\n');
        }
    }
    out
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= MAX_CELL_WIDTH {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(MAX_CELL_WIDTH - 1).collect();
        cut.push('…');
        cut
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PreviewRow<'a> {
    row: usize,
    record: &'a Record,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportSummary {
    path: String,
    file_name: String,
    format: ExportFormat,
    row_count: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MergeReport<'a> {
    stats: MergeStats,
    columns: &'a MergeColumns,
    anchor_column: Option<&'a str>,
    page: usize,
    page_count: usize,
    filtered_total: usize,
    rows: Vec<PreviewRow<'a>>,
    export: Option<ExportSummary>,
}

impl<'a> MergeReport<'a> {
    fn new(session: &'a MergeSession, page: &Page<'a>, exported: Option<&(PathBuf, ExportedFile)>) -> Self {
        Self {
            stats: session.stats(),
            columns: session.columns(),
            anchor_column: session.anchor_column(),
            page: page.page,
            page_count: page.page_count,
            filtered_total: page.filtered_total,
            rows: page
                .rows
                .iter()
                .map(|(row_id, record)| PreviewRow {
                    row: row_id.index() + 1,
                    record,
                })
                .collect(),
            export: exported.map(|(path, file)| ExportSummary {
                path: path.display().to_string(),
                file_name: file.file_name.clone(),
                format: file.format,
                row_count: file.row_count,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use costmerge_sheet::record;

    fn merge_args(argv: &[&str]) -> MergeArgs {
        let cli = Cli::parse_from(std::iter::once("costmerge").chain(argv.iter().copied()));
        match cli.command {
            Command::Merge(args) => args,
            Command::Inspect { .. } => panic!("expected merge command"),
        }
    }

    fn write_inputs(dir: &Path) -> (PathBuf, PathBuf) {
        let cost = dir.join("cost.csv");
        let order = dir.join("order.csv");
        std::fs::write(&cost, "商家编码,成本\nA1,5\nB2,7\nA1,8\n").unwrap();
        std::fs::write(&order, "子订单编号,商家编码,商品金额\nSO1,a1,100\nSO2,zz,50\n").unwrap();
        (cost, order)
    }

    // ========================================================================
    // CLI argument parsing tests
    // ========================================================================

    #[test]
    fn test_cli_parse_inspect() {
        let cli = Cli::parse_from(["costmerge", "inspect", "cost.xlsx", "--json"]);
        match cli.command {
            Command::Inspect { file, json } => {
                assert_eq!(file, PathBuf::from("cost.xlsx"));
                assert!(json);
            }
            Command::Merge(_) => panic!("expected inspect command"),
        }
        assert!(!cli.verbose);
    }

    #[test]
    fn test_cli_parse_merge_defaults() {
        let args = merge_args(&["merge", "--cost", "c.xlsx", "--order", "o.xlsx"]);
        assert_eq!(args.format, ExportFormat::Csv);
        assert_eq!(args.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(args.filter, MatchFilter::All);
        assert_eq!(args.search_field, SearchField::All);
        assert_eq!(args.page, 1);
        assert_eq!(args.page_size, DEFAULT_PAGE_SIZE);
        assert!(args.cost_key.is_none());
        assert!(args.edits.is_empty());
    }

    #[test]
    fn test_cli_parse_merge_options() {
        let args = merge_args(&[
            "merge",
            "--cost",
            "c.xlsx",
            "--order",
            "o.xlsx",
            "-f",
            "xlsx",
            "--filter",
            "unmatched",
            "--search-field",
            "merchant-code",
            "--set",
            "3=12.5",
            "--set",
            "4=",
            "-v",
        ]);
        assert_eq!(args.format, ExportFormat::Xlsx);
        assert_eq!(args.filter, MatchFilter::Unmatched);
        assert_eq!(args.search_field, SearchField::MerchantCode);
        assert_eq!(args.edits, vec!["3=12.5", "4="]);
    }

    #[test]
    fn test_cli_rejects_unknown_format() {
        let parsed = Cli::try_parse_from(["costmerge", "merge", "--cost", "c", "--order", "o", "-f", "pdf"]);
        assert!(parsed.is_err());
    }

    // ========================================================================
    // helper tests
    // ========================================================================

    #[test]
    fn test_parse_edit() {
        let (row, value) = parse_edit("3=12.5").unwrap();
        assert_eq!(row, RowId(2));
        assert_eq!(value, CellValue::Float(12.5));

        let (_, value) = parse_edit("1=").unwrap();
        assert_eq!(value, CellValue::Null);

        assert!(parse_edit("0=1").is_err());
        assert!(parse_edit("x=1").is_err());
        assert!(parse_edit("12").is_err());
    }

    #[test]
    fn test_output_target() {
        assert_eq!(output_target(None), (PathBuf::new(), None));

        let dir = tempfile::tempdir().unwrap();
        assert_eq!(output_target(Some(dir.path())), (dir.path().to_path_buf(), None));

        let file = dir.path().join("result.xlsx");
        assert_eq!(
            output_target(Some(&file)),
            (dir.path().to_path_buf(), Some("result.xlsx".to_string()))
        );
    }

    #[test]
    fn test_render_table() {
        let data = vec![
            record([("code", CellValue::from("A1")), ("cost", CellValue::Int(5))]),
            record([("code", CellValue::from("B2")), ("cost", CellValue::Null)]),
        ];
        let headers = collect_headers(&data);
        let page = costmerge_core::project(&data, "cost", &ViewQuery::default());

        let table = render_table(&headers, &page);
        assert_eq!(table, "#  code  cost\n-  ----  ----\n1  A1    5\n2  B2\n");

        let empty = costmerge_core::project(&data, "cost", &ViewQuery::default().with_search("zz", SearchField::All));
        assert_eq!(render_table(&headers, &empty), "(no rows)\n");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short"), "short");
        let long = "x".repeat(40);
        let cut = truncate(&long);
        assert_eq!(cut.chars().count(), MAX_CELL_WIDTH);
        assert!(cut.ends_with('…'));
    }

    #[test]
    fn test_inspect_report() {
        let data = vec![record([
            ("商家编码", CellValue::from("A1")),
            ("商品金额", CellValue::Int(5)),
            ("成本", CellValue::Int(2)),
        ])];
        let report = InspectReport::new(Path::new("cost.csv"), &data);
        assert_eq!(report.rows, 1);
        assert_eq!(report.suggested_key.as_deref(), Some("商家编码"));
        assert_eq!(report.suggested_value.as_deref(), Some("成本"));
        assert_eq!(report.anchor_column.as_deref(), Some("商品金额"));
    }

    // ========================================================================
    // Integration tests
    // ========================================================================

    #[tokio::test]
    async fn test_run_merge_exports_csv() {
        let dir = tempfile::tempdir().unwrap();
        let (cost, order) = write_inputs(dir.path());
        let output = dir.path().join("result");

        let args = merge_args(&[
            "merge",
            "--cost",
            cost.to_str().unwrap(),
            "--order",
            order.to_str().unwrap(),
            "--output",
            output.to_str().unwrap(),
            "--set",
            "2=6",
        ]);
        run_merge(args).await.unwrap();

        let written = std::fs::read_to_string(dir.path().join("result.csv")).unwrap();
        assert_eq!(
            written,
            "\u{feff}子订单编号,商家编码,商品金额,成本\r\nSO1,a1,100,8\r\nSO2,zz,50,6\r\n"
        );
    }

    #[tokio::test]
    async fn test_run_merge_explicit_columns_xlsx() {
        let dir = tempfile::tempdir().unwrap();
        let (cost, order) = write_inputs(dir.path());

        let args = merge_args(&[
            "merge",
            "--cost",
            cost.to_str().unwrap(),
            "--order",
            order.to_str().unwrap(),
            "--cost-key",
            "商家编码",
            "--order-key",
            "商家编码",
            "--value",
            "成本",
            "-f",
            "xlsx",
            "-o",
            dir.path().to_str().unwrap(),
            "--json",
        ]);
        run_merge(args).await.unwrap();

        let exported: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(".xlsx"))
            .collect();
        assert_eq!(exported.len(), 1);
        assert!(exported[0].starts_with("合并数据_"));
    }

    #[tokio::test]
    async fn test_run_merge_rejects_unknown_row() {
        let dir = tempfile::tempdir().unwrap();
        let (cost, order) = write_inputs(dir.path());

        let args = merge_args(&[
            "merge",
            "--cost",
            cost.to_str().unwrap(),
            "--order",
            order.to_str().unwrap(),
            "--set",
            "9=1",
            "--no-export",
        ]);
        let err = run_merge(args).await.unwrap_err();
        assert!(err.to_string().contains("9=1"));
    }

    #[tokio::test]
    async fn test_run_merge_reports_decode_failure() {
        let dir = tempfile::tempdir().unwrap();
        let (cost, _) = write_inputs(dir.path());
        let empty = dir.path().join("empty.csv");
        std::fs::write(&empty, "").unwrap();

        let args = merge_args(&[
            "merge",
            "--cost",
            cost.to_str().unwrap(),
            "--order",
            empty.to_str().unwrap(),
        ]);
        let err = run_merge(args).await.unwrap_err();
        assert!(err.to_string().starts_with("Failed to decode order file"));
    }

    #[tokio::test]
    async fn test_inspect_missing_file() {
        let err = inspect(Path::new("/nonexistent/cost.xlsx"), false).await.unwrap_err();
        assert!(err.to_string().starts_with("Failed to read file"));
    }
}
