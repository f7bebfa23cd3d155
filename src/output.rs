use anyhow::{Context, Result};
use log::{error, info};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use swarm_common::{Dot, OutputConfig, Snapshot};

/// Serialization format for recorded snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    /// A `u32` snapshot count followed by each snapshot, the layout the visualizer streams.
    Bincode,
    MessagePack,
}

impl OutputFormat {
    /// Reads the configured format name. Unknown names fall back to JSON.
    pub fn from_config(format: Option<&str>) -> Self {
        match format.unwrap_or("json") {
            "json" => OutputFormat::Json,
            "bincode" => OutputFormat::Bincode,
            "messagepack" => OutputFormat::MessagePack,
            other => {
                error!("Unknown output format: {}. Using JSON instead.", other);
                OutputFormat::Json
            }
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Bincode => "bin",
            OutputFormat::MessagePack => "msgpack",
        }
    }
}

/// Writes snapshots in the given format.
pub fn write_snapshots<W: Write>(mut writer: W, snapshots: &[Snapshot], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            serde_json::to_writer(&mut writer, snapshots).context("Error serializing snapshots to JSON")?;
        }
        OutputFormat::Bincode => {
            bincode::serialize_into(&mut writer, &(snapshots.len() as u32))
                .context("Error writing snapshot count header")?;
            for snapshot in snapshots {
                bincode::serialize_into(&mut writer, snapshot).context("Error serializing snapshot to bincode")?;
            }
        }
        OutputFormat::MessagePack => {
            rmp_serde::encode::write(&mut writer, snapshots).context("Error serializing snapshots to MessagePack")?;
        }
    }
    writer.flush()?;
    Ok(())
}

/// Saves all snapshots to `<base_filename>_snapshots.<ext>`.
pub fn save_snapshots(snapshots: &[Snapshot], output: &OutputConfig) -> Result<PathBuf> {
    let format = OutputFormat::from_config(output.format.as_deref());
    let filename = PathBuf::from(format!("{}_snapshots.{}", output.base_filename, format.extension()));
    let file = File::create(&filename)
        .with_context(|| format!("Error creating snapshot file '{}'", filename.display()))?;

    write_snapshots(BufWriter::new(file), snapshots, format)?;
    info!("All {} snapshots saved to {} ({:?} format)", snapshots.len(), filename.display(), format);
    Ok(filename)
}

/// Writes one CSV row per dot: id, group, position and velocity.
pub fn write_final_positions<W: Write>(writer: W, dots: &[Dot]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(["id", "group", "x", "y", "vx", "vy"])?;
    for dot in dots {
        writer.write_record(&[
            dot.id.0.to_string(),
            dot.group.to_string(),
            format!("{:.4}", dot.position.x),
            format!("{:.4}", dot.position.y),
            format!("{:.4}", dot.velocity.x),
            format!("{:.4}", dot.velocity.y),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Saves final dot state to `<base_filename>_final_positions.csv`.
pub fn save_final_positions(dots: &[Dot], base_filename: &str) -> Result<PathBuf> {
    let filename = PathBuf::from(format!("{}_final_positions.csv", base_filename));
    let file = File::create(&filename)
        .with_context(|| format!("Error creating CSV file '{}'", filename.display()))?;
    write_final_positions(file, dots)?;
    info!("Final positions saved to {}", filename.display());
    Ok(filename)
}

#[cfg(test)]
mod tests {
    use super::*;
    use swarm_common::{DotFrame, DotId, Group, Personality, Vec2};

    fn snapshot(step: u32) -> Snapshot {
        Snapshot {
            step,
            dot_count: 1,
            group_counts: [0, 1, 0, 0],
            average_speed: 1.5,
            polarization: 1.0,
            neighbor_counts_distribution: vec![1, 0, 0],
            dots: Some(vec![DotFrame { id: DotId(4), group: Group::B, x: 1.0, y: 2.0, heading: 0.25 }]),
        }
    }

    #[test]
    fn format_names_map_to_formats() {
        assert_eq!(OutputFormat::from_config(None), OutputFormat::Json);
        assert_eq!(OutputFormat::from_config(Some("bincode")), OutputFormat::Bincode);
        assert_eq!(OutputFormat::from_config(Some("messagepack")), OutputFormat::MessagePack);
        assert_eq!(OutputFormat::from_config(Some("yaml")), OutputFormat::Json);
    }

    #[test]
    fn bincode_stream_starts_with_count_header() {
        let mut buf = Vec::new();
        write_snapshots(&mut buf, &[snapshot(0), snapshot(2)], OutputFormat::Bincode).expect("write");

        let mut reader = buf.as_slice();
        let count: u32 = bincode::deserialize_from(&mut reader).expect("header");
        assert_eq!(count, 2);
        let first: Snapshot = bincode::deserialize_from(&mut reader).expect("first");
        let second: Snapshot = bincode::deserialize_from(&mut reader).expect("second");
        assert_eq!(first.step, 0);
        assert_eq!(second.step, 2);
        assert_eq!(second.dots.expect("dots")[0].id, DotId(4));
    }

    #[test]
    fn json_output_is_an_array() {
        let mut buf = Vec::new();
        write_snapshots(&mut buf, &[snapshot(3)], OutputFormat::Json).expect("write");
        let value: serde_json::Value = serde_json::from_slice(&buf).expect("json");
        assert_eq!(value[0]["step"], 3);
        assert_eq!(value[0]["dots"][0]["group"], "B");
    }

    #[test]
    fn final_positions_csv_has_a_row_per_dot() {
        let personality = Personality { max_speed: 2.0, love_for_others: 1.0, loathe_for_others: 1.0, group_aversion: 1.0 };
        let dots = vec![
            Dot::new(DotId(0), Group::A, Vec2::new(1.0, 2.0), Vec2::new(2.0, 0.0), personality),
            Dot::new(DotId(1), Group::D, Vec2::new(3.5, 4.25), Vec2::new(0.0, -2.0), personality),
        ];
        let mut buf = Vec::new();
        write_final_positions(&mut buf, &dots).expect("csv");

        let text = String::from_utf8(buf).expect("utf8");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "id,group,x,y,vx,vy");
        assert_eq!(lines[2], "1,D,3.5000,4.2500,0.0000,-2.0000");
        assert_eq!(lines.len(), 3);
    }
}
