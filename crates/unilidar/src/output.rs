use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use unilidar_reader::{Diagnostics, Message, PointCloud};

/// Points shown per cloud in table and pretty output.
const POINT_PREVIEW: usize = 10;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct MessageOutput<'a> {
    kind: &'static str,
    delay_us: Option<f64>,
    message: &'a Message,
}

pub fn print_message(message: &Message, delay_us: Option<f64>, format: OutputFormat) {
    if message.is_none() {
        return;
    }
    match format {
        OutputFormat::Json => {
            let out = MessageOutput {
                kind: message.kind().as_str(),
                delay_us,
                message,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["KIND", "STAMP", "DETAIL", "DELAY (us)"])
                .add_row(vec![
                    message.kind().to_string(),
                    message
                        .stamp()
                        .map(|s| format!("{s:.6}"))
                        .unwrap_or_else(|| "-".to_string()),
                    summary(message),
                    delay_us
                        .map(|d| format!("{d:.0}"))
                        .unwrap_or_else(|| "-".to_string()),
                ]);
            println!("{table}");
            if let Message::PointCloud(cloud) = message {
                println!("{}", point_table(cloud));
            }
        }
        OutputFormat::Pretty => {
            let stamp = message
                .stamp()
                .map(|s| format!(" stamp={s:.6}"))
                .unwrap_or_default();
            let delay = delay_us
                .map(|d| format!(" delay_us={d:.0}"))
                .unwrap_or_default();
            println!("{}{stamp} {}{delay}", message.kind(), summary(message));
            if let Message::PointCloud(cloud) = message {
                for p in cloud.points.iter().take(POINT_PREVIEW) {
                    println!(
                        "  ({:.4}, {:.4}, {:.4}, {:.1}, {:.6}, {})",
                        p.x, p.y, p.z, p.intensity, p.time, p.ring
                    );
                }
                if cloud.points.len() > POINT_PREVIEW {
                    println!("  ...");
                }
            }
        }
    }
}

pub fn print_diagnostics(diag: &Diagnostics, format: OutputFormat) {
    let rows = [
        ("frames", diag.frames),
        ("checksum_failures", diag.checksum_failures),
        ("oversize_lengths", diag.oversize_lengths),
        ("skipped_bytes", diag.skipped_bytes),
        ("overflow_dropped", diag.overflow_dropped),
        ("resync_events", diag.resync_events),
        ("decode_errors", diag.decode_errors),
        ("skipped_frames", diag.skipped_frames),
        ("command_echoes", diag.command_echoes),
    ];
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(diag).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["COUNTER", "VALUE"]);
            for (name, value) in rows {
                table.add_row(vec![name.to_string(), value.to_string()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let line: Vec<String> = rows
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect();
            println!("{}", line.join(" "));
        }
    }
}

fn summary(message: &Message) -> String {
    match message {
        Message::None => String::new(),
        Message::Imu(imu) => format!(
            "id={} quaternion=[{:.4}, {:.4}, {:.4}, {:.4}]",
            imu.id, imu.quaternion[0], imu.quaternion[1], imu.quaternion[2], imu.quaternion[3]
        ),
        Message::PointCloud(cloud) => format!(
            "id={} points={} rings={}",
            cloud.id,
            cloud.points.len(),
            cloud.ring_num
        ),
        Message::Version(version) => format!("firmware={}", version.firmware),
        Message::Auxiliary(aux) => format!("dirty={}%", aux.dirty_percentage),
    }
}

fn point_table(cloud: &PointCloud) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["X", "Y", "Z", "INTENSITY", "TIME", "RING"]);
    for p in cloud.points.iter().take(POINT_PREVIEW) {
        table.add_row(vec![
            format!("{:.4}", p.x),
            format!("{:.4}", p.y),
            format!("{:.4}", p.z),
            format!("{:.1}", p.intensity),
            format!("{:.6}", p.time),
            p.ring.to_string(),
        ]);
    }
    table
}
