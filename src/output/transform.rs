//! Output transforms
//!
//! Each transform writes the merged run record to a file. They are applied
//! in the order listed here.

use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;
use tracing::info;

use super::record::AssembliesRecord;

/// A named writer for the run record
pub struct Transform {
    pub name: &'static str,
    pub description: &'static str,
    write: fn(&AssembliesRecord, &Path) -> Result<()>,
}

impl Transform {
    pub fn apply(&self, record: &AssembliesRecord, path: &Path) -> Result<()> {
        (self.write)(record, path)
            .with_context(|| format!("Failed to write {} output to {}", self.name, path.display()))?;
        info!("Wrote {} output to {}", self.name, path.display());
        Ok(())
    }
}

static TRANSFORMS: &[Transform] = &[
    Transform {
        name: "xml",
        description: "output results to xUnit-style XML file",
        write: write_xml,
    },
    Transform {
        name: "json",
        description: "output results to JSON file",
        write: write_json,
    },
    Transform {
        name: "csv",
        description: "output results to CSV file (one row per test)",
        write: write_csv,
    },
];

/// Registered transforms in application order
pub fn available() -> &'static [Transform] {
    TRANSFORMS
}

pub fn find(name: &str) -> Option<&'static Transform> {
    TRANSFORMS.iter().find(|t| t.name.eq_ignore_ascii_case(name))
}

fn write_json(record: &AssembliesRecord, path: &Path) -> Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, record)?;
    Ok(())
}

fn write_csv(record: &AssembliesRecord, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;

    writer.write_record([
        "assembly", "name", "type", "method", "result", "time", "traits", "message",
    ])?;

    for assembly in &record.assemblies {
        for test in &assembly.tests {
            let traits = test
                .traits
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join(";");
            let message = test
                .failure_message
                .clone()
                .or_else(|| test.skip_reason.clone())
                .unwrap_or_default();
            writer.write_record([
                assembly.name.clone(),
                test.name.clone(),
                test.class_name.clone(),
                test.method.clone(),
                test.result.as_str().to_string(),
                format!("{:.3}", test.time),
                traits,
                message,
            ])?;
        }
    }
    writer.flush()?;
    Ok(())
}

fn write_xml(record: &AssembliesRecord, path: &Path) -> Result<()> {
    fs::write(path, render_xml(record))?;
    Ok(())
}

/// Escape text for XML attribute and element content
fn xml_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            '\n' => escaped.push_str("&#xA;"),
            '\r' => escaped.push_str("&#xD;"),
            '\t' => escaped.push_str("&#x9;"),
            c if (c as u32) < 0x20 => {}
            c => escaped.push(c),
        }
    }
    escaped
}

fn render_xml(record: &AssembliesRecord) -> String {
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<assemblies>\n");

    // Writing to a String cannot fail
    for assembly in &record.assemblies {
        let _ = writeln!(
            xml,
            "  <assembly name=\"{}\" config-file=\"{}\" run-date=\"{}\" run-time=\"{}\" total=\"{}\" passed=\"{}\" failed=\"{}\" skipped=\"{}\" errors=\"{}\" time=\"{:.3}\">",
            xml_escape(&assembly.assembly_file.display().to_string()),
            xml_escape(
                &assembly
                    .config_file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default()
            ),
            assembly.run_date,
            assembly.run_time,
            assembly.total,
            assembly.passed,
            assembly.failed,
            assembly.skipped,
            assembly.errors,
            assembly.time,
        );

        if !assembly.error_messages.is_empty() {
            xml.push_str("    <errors>\n");
            for message in &assembly.error_messages {
                let _ = writeln!(
                    xml,
                    "      <error><failure><message>{}</message></failure></error>",
                    xml_escape(message)
                );
            }
            xml.push_str("    </errors>\n");
        }

        let _ = writeln!(xml, "    <collection name=\"{}\">", xml_escape(&assembly.name));
        for test in &assembly.tests {
            let _ = write!(
                xml,
                "      <test name=\"{}\" type=\"{}\" method=\"{}\" time=\"{:.3}\" result=\"{}\"",
                xml_escape(&test.name),
                xml_escape(&test.class_name),
                xml_escape(&test.method),
                test.time,
                test.result.as_str(),
            );

            let has_body = !test.traits.is_empty()
                || test.failure_message.is_some()
                || test.skip_reason.is_some()
                || !test.output.is_empty();
            if !has_body {
                xml.push_str(" />\n");
                continue;
            }
            xml.push_str(">\n");

            if !test.traits.is_empty() {
                xml.push_str("        <traits>\n");
                for (name, value) in &test.traits {
                    let _ = writeln!(
                        xml,
                        "          <trait name=\"{}\" value=\"{}\" />",
                        xml_escape(name),
                        xml_escape(value)
                    );
                }
                xml.push_str("        </traits>\n");
            }
            if let Some(message) = &test.failure_message {
                let _ = writeln!(
                    xml,
                    "        <failure><message>{}</message></failure>",
                    xml_escape(message)
                );
            }
            if let Some(reason) = &test.skip_reason {
                let _ = writeln!(xml, "        <reason>{}</reason>", xml_escape(reason));
            }
            if !test.output.is_empty() {
                let _ = writeln!(xml, "        <output>{}</output>", xml_escape(&test.output));
            }
            xml.push_str("      </test>\n");
        }
        xml.push_str("    </collection>\n  </assembly>\n");
    }

    xml.push_str("</assemblies>\n");
    xml
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AssemblyDescriptor, AssemblyTotals, ExecutionMessage, TestCase};
    use crate::output::record::RecordBuilder;
    use tempfile::tempdir;

    fn sample_record() -> AssembliesRecord {
        let mut builder = RecordBuilder::new(&AssemblyDescriptor::new("Sample.Tests.yaml"));
        builder.observe(&ExecutionMessage::TestPassed {
            test: TestCase::new("A", "fast").with_trait("category", "fast"),
            time: 0.1,
            output: String::new(),
        });
        builder.observe(&ExecutionMessage::TestFailed {
            test: TestCase::new("A", "broken"),
            time: 0.2,
            message: "expected <1> & got \"2\"".into(),
            output: String::new(),
        });
        builder.observe(&ExecutionMessage::AssemblyFinished {
            assembly: "Sample.Tests".into(),
            totals: AssemblyTotals {
                total: 2,
                failed: 1,
                skipped: 0,
                time: 0.3,
            },
        });
        AssembliesRecord::new(vec![builder.finish()])
    }

    #[test]
    fn test_registration_order() {
        let names: Vec<_> = available().iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["xml", "json", "csv"]);
        assert!(find("XML").is_some());
        assert!(find("html").is_none());
    }

    #[test]
    fn test_xml_escape() {
        assert_eq!(xml_escape("a<b>&\"c'"), "a&lt;b&gt;&amp;&quot;c&apos;");
        assert_eq!(xml_escape("x\u{1}y"), "xy");
    }

    #[test]
    fn test_xml_output() {
        let xml = render_xml(&sample_record());
        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains("total=\"2\" passed=\"1\" failed=\"1\""));
        assert!(xml.contains("<trait name=\"category\" value=\"fast\" />"));
        assert!(xml.contains("expected &lt;1&gt; &amp; got &quot;2&quot;"));
        assert!(xml.contains("result=\"Fail\""));
        assert!(xml.trim_end().ends_with("</assemblies>"));
    }

    #[test]
    fn test_json_and_csv_files() {
        let dir = tempdir().unwrap();
        let record = sample_record();

        let json_path = dir.path().join("out.json");
        find("json").unwrap().apply(&record, &json_path).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(json["assemblies"][0]["name"], "Sample.Tests");
        assert_eq!(json["assemblies"][0]["tests"][1]["result"], "Fail");

        let csv_path = dir.path().join("out.csv");
        find("csv").unwrap().apply(&record, &csv_path).unwrap();
        let mut reader = csv::Reader::from_path(&csv_path).unwrap();
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][1], "A.fast");
        assert_eq!(&rows[0][6], "category=fast");
        assert_eq!(&rows[1][4], "Fail");
    }

    #[test]
    fn test_apply_reports_unwritable_path() {
        let err = find("xml")
            .unwrap()
            .apply(&sample_record(), Path::new("/no/such/dir/out.xml"))
            .unwrap_err();
        assert!(err.to_string().contains("xml output"));
    }
}
