use crate::runner::OperationReport;

/// Entry banner printed before each batch entry's output.
pub fn banner(name: &str) -> String {
    format!("############### {} ###############\n", name)
}

/// Render collected results as pretty-printed JSON blocks, in step order:
/// request reply, dump replies, then notifications.
pub fn render_text_report(report: &OperationReport) -> anyhow::Result<String> {
    let mut out = String::new();

    if let Some(reply) = &report.reply {
        out.push_str(&serde_json::to_string_pretty(reply)?);
        out.push('\n');
    }
    if let Some(dump) = &report.dump {
        out.push_str(&serde_json::to_string_pretty(dump)?);
        out.push('\n');
    }
    if let Some(ntfs) = &report.notifications {
        out.push_str(&serde_json::to_string_pretty(ntfs)?);
        out.push('\n');
    }

    Ok(out)
}
