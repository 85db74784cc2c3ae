use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;
use clap::Parser;
use consult_core::{ConsultationInput, ConsultationType, SummaryConfig};
use consult_synth::analyze;

#[derive(Parser, Debug)]
#[command(
    name = "consult-cli",
    about = "Tạo bản tóm tắt có cấu trúc từ ghi chú bác sĩ."
)]
struct Args {
    /// Đường dẫn tới file JSON dữ liệu buổi khám.
    #[arg(
        short,
        long,
        conflicts_with = "notes",
        required_unless_present = "notes"
    )]
    input: Option<PathBuf>,

    /// Ghi chú bác sĩ nhập trực tiếp.
    #[arg(short, long)]
    notes: Option<String>,

    /// Lý do khám chính (dùng với --notes).
    #[arg(long, requires = "notes")]
    chief_complaint: Option<String>,

    /// Dị ứng đã biết (dùng với --notes).
    #[arg(long, requires = "notes")]
    allergies: Option<String>,

    /// Hình thức khám: video hoặc audio (dùng với --notes).
    #[arg(long, requires = "notes")]
    consultation_type: Option<ConsultationType>,

    /// Ngày khám (YYYY-MM-DD) để tính ngày tái khám.
    #[arg(long)]
    consulted_on: Option<NaiveDate>,

    /// In thêm các bệnh cảnh nhận diện được.
    #[arg(long)]
    conditions: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let input = load_input(&args)?;

    let config = SummaryConfig::default();
    let report = analyze(&input, &config)?;

    println!("{}", serde_json::to_string_pretty(&report.summary)?);

    if args.conditions {
        eprintln!(
            "Detected: {}\nUnhandled: {}\nFallback: {}",
            serde_json::to_string(&report.flags.matched())?,
            serde_json::to_string(&report.unhandled())?,
            report.fallback
        );
    }

    if let Some(consulted_on) = args.consulted_on {
        match report.summary.follow_up_plan(consulted_on)? {
            Some(plan) => eprintln!("Follow-up due: {} ({})", plan.due_on, plan.notes),
            None => eprintln!("No follow-up required"),
        }
    }

    Ok(())
}

fn load_input(args: &Args) -> anyhow::Result<ConsultationInput> {
    if let Some(path) = &args.input {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("Không đọc được file {:?}", path))?;
        return serde_json::from_str(&data)
            .with_context(|| format!("File {:?} không phải dữ liệu buổi khám hợp lệ", path));
    }

    Ok(ConsultationInput {
        doctor_notes: args.notes.clone().unwrap_or_default(),
        chief_complaint: args.chief_complaint.clone().unwrap_or_default(),
        allergies: args.allergies.clone().unwrap_or_default(),
        consultation_type: args.consultation_type.unwrap_or_default(),
        ..ConsultationInput::default()
    })
}
