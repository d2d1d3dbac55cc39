use crate::cli::{ActionArgs, ExportArgs, ReportArgs, SegmentsArgs, ViewArgs};
use crate::infra::{load_dataset, read_filters};
use chrono::Utc;
use loan_insight::config::AppConfig;
use loan_insight::error::AppError;
use loan_insight::portfolio::export::export_filename;
use loan_insight::portfolio::kpi::KpiDelta;
use loan_insight::portfolio::narrative::{fmt_count, fmt_money, fmt_pct};
use loan_insight::portfolio::{
    write_action_list, ActionListRequest, FilterSpec, LoanDataset, PortfolioAnalyzer,
    PortfolioReport,
};
use std::fs::File;
use std::io::BufWriter;

struct View {
    analyzer: PortfolioAnalyzer,
    dataset: LoanDataset,
    filters: FilterSpec,
}

fn prepare(view: ViewArgs) -> Result<View, AppError> {
    let config = AppConfig::load()?;
    let dataset = load_dataset(&config, view.dataset)?;
    let filters = read_filters(view.filters.as_deref())?;
    Ok(View {
        analyzer: PortfolioAnalyzer::new(config.analysis),
        dataset,
        filters,
    })
}

fn action_request(
    analyzer: &PortfolioAnalyzer,
    args: &ActionArgs,
) -> Result<ActionListRequest, AppError> {
    let top_n = args.top_n.unwrap_or(analyzer.config().default_top_n);
    Ok(ActionListRequest::new(args.sort_by, top_n, args.critical_only)?)
}

pub(crate) fn run_report(args: ReportArgs) -> Result<(), AppError> {
    let ReportArgs {
        view,
        actions,
        show,
    } = args;

    let View {
        analyzer,
        dataset,
        filters,
    } = prepare(view)?;
    let request = action_request(&analyzer, &actions)?;
    let report = analyzer.report(&dataset, &filters, &request)?;

    render_report(&report, show);
    Ok(())
}

pub(crate) fn run_segments(args: SegmentsArgs) -> Result<(), AppError> {
    let SegmentsArgs {
        view,
        dimension,
        min_count,
    } = args;

    let View {
        analyzer,
        dataset,
        filters,
    } = prepare(view)?;
    let min_count = min_count.unwrap_or(analyzer.config().min_segment_volume);
    let rows = analyzer.segment_ranking(&dataset, &filters, dimension, Some(min_count));

    println!("Default rate by {dimension} (segments with at least {min_count} loans)");
    if rows.is_empty() {
        println!("- No segment meets the minimum volume in the current view.");
        return Ok(());
    }
    for row in &rows {
        println!(
            "- {}: {} default rate | n={}",
            row.segment,
            fmt_pct(row.default_rate, 2),
            fmt_count(row.count)
        );
    }
    Ok(())
}

pub(crate) fn run_export(args: ExportArgs) -> Result<(), AppError> {
    let ExportArgs {
        view,
        actions,
        output,
        format,
    } = args;

    let View {
        analyzer,
        dataset,
        filters,
    } = prepare(view)?;
    let request = action_request(&analyzer, &actions)?;
    let rows = analyzer.action_list(&dataset, &filters, &request)?;

    let path = if output.is_dir() {
        output.join(export_filename(Utc::now(), format))
    } else {
        output
    };
    let writer = BufWriter::new(File::create(&path)?);
    write_action_list(&rows, writer, format)?;

    println!(
        "Wrote {} ranked loans ({}) to {}",
        fmt_count(rows.len()),
        format,
        path.display()
    );
    Ok(())
}

fn signed(delta: f64, render: impl Fn(f64) -> String) -> String {
    if delta >= 0.0 {
        format!("+{}", render(delta))
    } else {
        format!("-{}", render(-delta))
    }
}

fn pct_line(label: &str, kpi: &KpiDelta<f64>) {
    println!(
        "- {label}: {} ({} vs baseline)",
        fmt_pct(kpi.current, 2),
        signed(kpi.delta * 100.0, |value| format!("{value:.2} pp"))
    );
}

fn render_report(report: &PortfolioReport, show: usize) {
    let panorama = &report.panorama;

    println!("Loan portfolio report ({})", report.dataset.source);
    println!(
        "Generated {} | {} of {} loans in view",
        report.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
        fmt_count(report.filtered_count),
        fmt_count(report.baseline_count)
    );

    println!("\nPanorama");
    println!(
        "- Loans: {} ({} vs baseline)",
        fmt_count(panorama.count.current),
        signed(panorama.count.delta, |value| format!("{value:.0}"))
    );
    pct_line("Default rate", &panorama.default_rate);
    println!(
        "- Average loan amount: {} ({} vs baseline)",
        fmt_money(panorama.avg_loan_amount.current),
        signed(panorama.avg_loan_amount.delta, fmt_money)
    );
    println!(
        "- Average credit score: {:.0} ({} vs baseline)",
        panorama.avg_credit_score.current,
        signed(panorama.avg_credit_score.delta, |value| format!("{value:.1}"))
    );
    println!(
        "- Average interest rate: {:.2}% ({} vs baseline)",
        panorama.avg_interest_rate.current,
        signed(panorama.avg_interest_rate.delta, |value| format!("{value:.2} pp"))
    );
    println!(
        "- Value at risk: {} ({} vs baseline)",
        fmt_money(panorama.value_at_risk_total.current),
        signed(panorama.value_at_risk_total.delta, fmt_money)
    );
    println!(
        "- Average risk score: {:.3} ({} vs baseline)",
        panorama.avg_risk_score.current,
        signed(panorama.avg_risk_score.delta, |value| format!("{value:.3}"))
    );
    pct_line("Critical DTI rate", &panorama.critical_rate);

    println!("\nRisk bands");
    for band in &report.risk_bands {
        println!("- {}: {}", band.band_label, fmt_count(band.count));
    }

    for table in &report.segments {
        println!("\nRisk concentration by {}", table.dimension);
        for row in &table.rows {
            println!(
                "- {}: {} of value at risk | default {} | n={} | median credit {:.0} | {} / {} / {}",
                row.segment,
                fmt_pct(row.risk_share, 1),
                fmt_pct(row.default_rate, 2),
                fmt_count(row.count),
                row.median_credit_score,
                row.modal_employment_type,
                row.modal_education,
                row.modal_marital_status
            );
        }
    }

    println!("\nCredit score bands");
    for band in &report.credit_score_bands {
        println!(
            "- {}: {} loans | default {}",
            band.label,
            fmt_count(band.count),
            fmt_pct(band.default_rate, 2)
        );
    }

    if !report.drivers.is_empty() {
        println!("\nNumeric drivers (defaulted vs performing)");
        for driver in &report.drivers {
            println!(
                "- {}: {:.3} vs {:.3} ({})",
                driver.feature,
                driver.mean_default,
                driver.mean_non_default,
                signed(driver.delta_pct * 100.0, |value| format!("{value:.1}%"))
            );
        }
    }

    println!("\nConclusion: {}", report.headline);

    let request = &report.action_request;
    println!(
        "\nAction list: top {} by {}{} ({} loans)",
        request.top_n,
        request.sort_key,
        if request.critical_only {
            ", critical DTI only"
        } else {
            ""
        },
        fmt_count(report.action_list.len())
    );
    for (index, loan) in report.action_list.iter().take(show).enumerate() {
        println!(
            "  {:>3}. {} | score {:.3} ({}) | value at risk {} | DTI {:.2}{}",
            index + 1,
            loan.record.loan_id,
            loan.risk_score,
            loan.risk_band.label(),
            fmt_money(loan.value_at_risk),
            loan.record.dti_ratio,
            if loan.critical_dti { " | critical" } else { "" }
        );
    }
}
