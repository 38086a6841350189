// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Render an assembled timeline as a text report, a standalone HTML page or JSON.
// Author: Lukas Bower

//! Report rendering.
//!
//! Renderers only read the [`Timeline`]; all interval arithmetic comes from
//! [`BootSummary::durations`](crate::timeline::BootSummary::durations).

use std::fs;
use std::io;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::timeline::{BootDurations, BootRecord, BootSummary, Timeline};

const RULE: &str = "--------------------------------------------------------------------";
const HOSTNAME_SOURCES: [&str; 2] = ["/proc/sys/kernel/hostname", "/etc/hostname"];
const FALLBACK_HOSTNAME: &str = "localhost";

/// Identity of the machine and moment a report describes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportContext {
    /// Host name shown in report titles.
    pub hostname: String,
    /// Time the report was generated.
    pub generated_at: DateTime<Utc>,
}

impl ReportContext {
    /// Build a context for `hostname` stamped now.
    #[must_use]
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            generated_at: Utc::now(),
        }
    }

    /// Context for the running host.
    #[must_use]
    pub fn detect() -> Self {
        Self::new(hostname())
    }
}

/// Host name of the running system.
#[must_use]
pub fn hostname() -> String {
    hostname_from(HOSTNAME_SOURCES.iter().map(Path::new))
}

fn hostname_from<'a>(sources: impl IntoIterator<Item = &'a Path>) -> String {
    sources
        .into_iter()
        .filter_map(|path| fs::read_to_string(path).ok())
        .map(|text| text.trim().to_owned())
        .find(|name| !name.is_empty())
        .unwrap_or_else(|| FALLBACK_HOSTNAME.to_owned())
}

/// Machine-readable form of a finished timeline.
#[derive(Debug, Clone, Serialize)]
pub struct TimelineReport<'a> {
    /// Host name.
    pub hostname: &'a str,
    /// Generation time, RFC 3339.
    pub generated_at: String,
    /// Marker timestamps and counts.
    pub summary: BootSummary,
    /// Clamped summary intervals.
    pub durations: BootDurations,
    /// Bootloader and kernel records.
    pub primary: &'a [BootRecord],
    /// Co-processor records.
    pub secondary: &'a [BootRecord],
}

impl<'a> TimelineReport<'a> {
    /// Borrow `timeline` for serialization.
    #[must_use]
    pub fn new(timeline: &'a Timeline, context: &'a ReportContext) -> Self {
        let summary = timeline.summary();
        Self {
            hostname: &context.hostname,
            generated_at: context.generated_at.to_rfc3339(),
            summary,
            durations: summary.durations(),
            primary: timeline.primary().records(),
            secondary: timeline.secondary().records(),
        }
    }
}

fn record_line(record: &BootRecord) -> String {
    format!(
        "{:<30} = {:>6} ms (+{:>3} ms)\n",
        record.name, record.start_time, record.delta_time
    )
}

fn banner(out: &mut String, title: &str) {
    out.push_str(RULE);
    out.push('\n');
    out.push_str(&format!("                 {title}\n"));
    out.push_str(RULE);
    out.push('\n');
}

/// Plain-text report as printed on the console.
#[must_use]
pub fn render_text(timeline: &Timeline, context: &ReportContext) -> String {
    let durations = timeline.summary().durations();
    let mut out = String::new();
    banner(&mut out, &format!("{} Boot Time Report", context.hostname));
    for (label, value) in summary_rows(&durations) {
        out.push_str(&format!("{label:<24}: {value} ms\n"));
    }
    out.push_str(RULE);
    out.push_str("\n\n");

    banner(&mut out, "Bootloader and Kernel Boot Records");
    for record in timeline.primary().records() {
        out.push_str(&record_line(record));
    }
    out.push_str(RULE);
    out.push_str("\n\n");

    banner(&mut out, "MCU Boot Records");
    for record in timeline.secondary().records() {
        out.push_str(&record_line(record));
    }
    out.push_str(RULE);
    out.push('\n');
    out
}

fn summary_rows(durations: &BootDurations) -> [(&'static str, u64); 6] {
    [
        ("Device Power On", durations.power_on),
        ("SPL Time", durations.spl),
        ("U-Boot Time", durations.bootloader),
        ("Kernel handoff time", durations.handoff),
        ("Kernel Time", durations.kernel),
        ("Total Boot Time", durations.total),
    ]
}

/// Escape text for HTML element and attribute content.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Serialize `value` for inclusion inside a `<script>` element.
fn script_json(value: &Value) -> String {
    value
        .to_string()
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026")
}

/// Chart series for both chains laid out on one shared label axis.
///
/// Primary rows come first; each chain is padded with `null` on the rows
/// that belong to the other chain.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ChartSeries {
    labels: Vec<String>,
    abs_primary: Vec<Option<u64>>,
    abs_secondary: Vec<Option<u64>>,
    delta_primary: Vec<Option<u64>>,
    delta_secondary: Vec<Option<u64>>,
}

impl ChartSeries {
    fn build(primary: &[BootRecord], secondary: &[BootRecord]) -> Self {
        let pad_primary = std::iter::repeat(None).take(secondary.len());
        let pad_secondary = std::iter::repeat(None).take(primary.len());
        Self {
            labels: primary
                .iter()
                .map(|r| format!("A53: {}", r.name))
                .chain(secondary.iter().map(|r| format!("MCU: {}", r.name)))
                .collect(),
            abs_primary: primary
                .iter()
                .map(|r| Some(r.start_time))
                .chain(pad_primary.clone())
                .collect(),
            delta_primary: primary
                .iter()
                .map(|r| Some(r.delta_time))
                .chain(pad_primary)
                .collect(),
            abs_secondary: pad_secondary
                .clone()
                .chain(secondary.iter().map(|r| Some(r.start_time)))
                .collect(),
            delta_secondary: pad_secondary
                .chain(secondary.iter().map(|r| Some(r.delta_time)))
                .collect(),
        }
    }
}

fn stage_table(out: &mut String, title: &str, records: &[BootRecord]) {
    out.push_str(&format!("<h3>{}</h3>", escape_html(title)));
    out.push_str(
        "<table><thead><tr><th>#</th><th>Stage</th><th>Absolute (ms)</th>\
         <th>Delta (ms)</th></tr></thead><tbody>",
    );
    for (index, record) in records.iter().enumerate() {
        out.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            index + 1,
            escape_html(&record.name),
            record.start_time,
            record.delta_time
        ));
    }
    out.push_str("</tbody></table>");
}

const STYLE: &str = "body{font:14px system-ui,Segoe UI,Arial;margin:16px;}\
h1{font-size:18px;margin:0 0 10px 0}\
h3{margin:18px 0 8px 0}\
table{border-collapse:collapse;width:100%;font-size:12px}\
th,td{border:1px solid #e3e8ee;padding:6px 8px;text-align:left}\
th{background:#f7f9fc}\
.row{display:flex;gap:12px;align-items:center;flex-wrap:wrap;margin:12px 0}\
.summary{max-width:560px;margin:8px 0 16px 0}\
.chartbox{height:720px;margin:6px 0 14px 0}\
.stamp{color:#6b7280;font-size:12px}";

// Duration mode draws each bar as the window [start, start + delta].
const CHART_SCRIPT: &str = r#"const fmt=(v)=>v.toString()+" ms";
function toWindows(absArr,delArr){const out=[];for(let i=0;i<absArr.length;i++){const s=absArr[i],d=delArr[i];out.push(s==null||d==null?null:[s,s+d]);}return out;}
const durLinux=toWindows(absLinux,delLinux);
const durMCU=toWindows(absMCU,delMCU);
Chart.register({id:'valueOnBar',afterDatasetsDraw(c){const ctx=c.ctx,x=c.scales.x,y=c.scales.y;ctx.save();ctx.font='12px sans-serif';ctx.fillStyle='#000';ctx.textAlign='left';ctx.textBaseline='middle';c.data.datasets.forEach(ds=>{ds.data.forEach((v,i)=>{if(v==null)return;const val=Array.isArray(v)?v[1]-v[0]:v;const xp=x.getPixelForValue(Array.isArray(v)?v[1]:v);ctx.fillText(fmt(val),xp+6,y.getPixelForValue(i));});});ctx.restore();}});
let mode='abs';
const chart=new Chart(document.getElementById('chartCombined').getContext('2d'),{type:'bar',data:{labels:labels,datasets:[{label:'A53 / Linux',data:absLinux.slice()},{label:'MCU',data:absMCU.slice()}]},options:{indexAxis:'y',responsive:true,maintainAspectRatio:false,scales:{x:{beginAtZero:true,title:{display:true,text:'Boot Time (ms)'}}},plugins:{legend:{display:true},tooltip:{enabled:true},valueOnBar:{}}}});
function render(){chart.data.datasets[0].data=(mode==='abs')?absLinux.slice():durLinux.slice();chart.data.datasets[1].data=(mode==='abs')?absMCU.slice():durMCU.slice();chart.update();}
document.querySelectorAll('input[name="mode"]').forEach(r=>{r.addEventListener('change',e=>{mode=e.target.value;render();});});
render();
"#;

/// Standalone HTML page with summary, interactive chart and record tables.
#[must_use]
pub fn render_html(timeline: &Timeline, context: &ReportContext) -> String {
    let host = escape_html(&context.hostname);
    let durations = timeline.summary().durations();
    let primary = timeline.primary().records();
    let secondary = timeline.secondary().records();
    let series = ChartSeries::build(primary, secondary);

    let mut out = String::with_capacity(16 * 1024);
    out.push_str("<!doctype html><html><head><meta charset='utf-8'>");
    out.push_str("<meta name='viewport' content='width=device-width,initial-scale=1'>");
    out.push_str(&format!("<title>{host} Boot Time Report</title>"));
    out.push_str(&format!("<style>{STYLE}</style>"));
    out.push_str("<script src='https://cdn.jsdelivr.net/npm/chart.js'></script>");
    out.push_str("</head><body>");
    out.push_str(&format!("<h1>{host} Boot Time Report</h1>"));
    out.push_str(&format!(
        "<p class='stamp'>Generated {}</p>",
        escape_html(&context.generated_at.to_rfc3339())
    ));

    out.push_str(
        "<table class='summary'><thead><tr><th colspan='2'>Boot Time Report Summary</th>\
         </tr></thead><tbody>",
    );
    let rows = summary_rows(&durations);
    let last = rows.len() - 1;
    for (index, (label, value)) in rows.into_iter().enumerate() {
        if index == last {
            out.push_str(&format!("<tr><td><b>{label}</b></td><td><b>{value} ms</b></td></tr>"));
        } else {
            out.push_str(&format!("<tr><td>{label}</td><td>{value} ms</td></tr>"));
        }
    }
    out.push_str("</tbody></table>");

    out.push_str(
        "<div class='row'>\
         <label><input type='radio' name='mode' value='abs' checked> Absolute</label>\
         <label><input type='radio' name='mode' value='dur'> Duration</label>\
         </div><div class='chartbox'><canvas id='chartCombined'></canvas></div>",
    );

    out.push_str("<script>\n");
    out.push_str(&format!(
        "const labels={};\n",
        script_json(&Value::from(series.labels))
    ));
    for (name, data) in [
        ("absLinux", series.abs_primary),
        ("absMCU", series.abs_secondary),
        ("delLinux", series.delta_primary),
        ("delMCU", series.delta_secondary),
    ] {
        out.push_str(&format!("const {name}={};\n", script_json(&Value::from(data))));
    }
    out.push_str(CHART_SCRIPT);
    out.push_str("</script>");

    stage_table(&mut out, "Bootloader & Linux Stages", primary);
    if !secondary.is_empty() {
        stage_table(&mut out, "MCU Stages", secondary);
    }
    out.push_str("</body></html>\n");
    out
}

/// Render the HTML report and write it to `path`.
pub fn write_html(path: &Path, timeline: &Timeline, context: &ReportContext) -> io::Result<()> {
    fs::write(path, render_html(timeline, context))?;
    log::info!("HTML report written to {}", path.display());
    Ok(())
}
