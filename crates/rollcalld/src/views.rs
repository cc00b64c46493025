//! Inline HTML pages.

use rollcall_core::AttendanceRecord;
use rollcall_export::xml_escape as escape;
use std::fmt::Write as _;

fn page(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title} · Rollcall</title>
<style>
body {{ font-family: sans-serif; max-width: 48rem; margin: 2rem auto; }}
table {{ border-collapse: collapse; }}
th, td {{ border: 1px solid #444; padding: 0.3rem 0.8rem; text-align: center; }}
th {{ background: #888; color: #f5f5f5; }}
.notice {{ background: #ffd; border: 1px solid #cc8; padding: 0.5rem; }}
nav a {{ margin-right: 1rem; }}
</style>
</head>
<body>
<h1>{title}</h1>
{body}
</body>
</html>"#,
        title = escape(title),
    )
}

pub fn index() -> String {
    page(
        "Rollcall",
        r#"<p>Face and voice attendance tracking.</p>
<p><a href="/login">Administrator login</a></p>"#,
    )
}

pub fn login() -> String {
    page(
        "Login",
        r#"<form method="post" action="/login">
<p><label>Username <input name="username" autocomplete="username" required></label></p>
<p><label>Password <input name="password" type="password" autocomplete="current-password" required></label></p>
<p><button type="submit">Log in</button></p>
</form>"#,
    )
}

/// Human-readable text for a notice tag passed back to the dashboard.
fn notice_text(tag: &str) -> String {
    match tag {
        "recognized" => "Roll number recorded.".to_string(),
        "already-marked" => "Roll number was already marked present.".to_string(),
        "no-speech" => "No speech was recognized. Please try again.".to_string(),
        "service-error" => "The speech service is unavailable.".to_string(),
        other => escape(other),
    }
}

pub fn dashboard(username: &str, records: &[AttendanceRecord], notice: Option<&str>) -> String {
    let mut body = String::new();
    let _ = write!(
        body,
        r#"<nav><a href="/register">Register attendee</a><a href="/mark_attendance">Mark attendance</a><a href="/clear_attendance">Clear attendance</a><a href="/logout">Log out ({})</a></nav>"#,
        escape(username)
    );
    if let Some(tag) = notice {
        let _ = write!(body, r#"<p class="notice">{}</p>"#, notice_text(tag));
    }

    body.push_str("<h2>Attendance</h2>");
    if records.is_empty() {
        body.push_str("<p>No attendance recorded.</p>");
    } else {
        body.push_str("<table><tr><th>Name/Roll Number</th><th>Status</th></tr>");
        for record in records {
            let _ = write!(
                body,
                "<tr><td>{}</td><td>{}</td></tr>",
                escape(record.display_label()),
                escape(record.display_status())
            );
        }
        body.push_str("</table>");
    }

    body.push_str(
        r#"<p>Export: <a href="/export?format=excel">Excel</a> · <a href="/export?format=pdf">PDF</a> · <a href="/export?format=word">Word</a></p>"#,
    );
    page("Dashboard", &body)
}

pub fn register() -> String {
    page(
        "Register attendee",
        r#"<form method="post" action="/register" id="register">
<p><label>Name <input name="name" required></label></p>
<p><label>Roll number <input name="roll_number" required></label></p>
<video id="video" width="320" height="240" autoplay playsinline></video>
<canvas id="canvas" width="320" height="240" hidden></canvas>
<input type="hidden" name="image" id="image">
<p><button type="submit">Capture and register</button></p>
</form>
<p><a href="/dashboard">Back</a></p>
<script>
const video = document.getElementById('video');
navigator.mediaDevices.getUserMedia({ video: true }).then(s => { video.srcObject = s; });
document.getElementById('register').addEventListener('submit', () => {
  const canvas = document.getElementById('canvas');
  canvas.getContext('2d').drawImage(video, 0, 0, canvas.width, canvas.height);
  document.getElementById('image').value = canvas.toDataURL('image/jpeg');
});
</script>"#,
    )
}

pub fn mark_attendance() -> String {
    page(
        "Mark attendance",
        r#"<form method="post" action="/mark_attendance/facial"><button type="submit">Scan faces</button></form>
<form method="post" action="/mark_attendance/speech"><button type="submit">Say roll number</button></form>
<p><a href="/dashboard">Back</a></p>"#,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_are_escaped() {
        let html = dashboard("admin", &[AttendanceRecord::present_by_name(r#"<b>"O'Neil" & co</b>"#)], None);
        assert!(html.contains("<td>&lt;b&gt;&quot;O&apos;Neil&quot; &amp; co&lt;/b&gt;</td>"));
    }

    #[test]
    fn test_dashboard_rows_and_fallbacks() {
        let records = vec![
            AttendanceRecord::present_by_name("Ada"),
            AttendanceRecord::present_by_roll("42"),
            AttendanceRecord {
                name: None,
                roll_number: None,
                status: None,
            },
        ];
        let html = dashboard("admin", &records, None);
        assert_eq!(html.matches("<tr>").count(), 4);
        assert!(html.contains("<td>Ada</td><td>present</td>"));
        assert!(html.contains("<td>42</td><td>present</td>"));
        assert!(html.contains("<td>Unknown</td><td>Unknown</td>"));
        assert!(!html.contains("class=\"notice\""));
    }

    #[test]
    fn test_dashboard_notice_is_escaped() {
        let html = dashboard("admin", &[], Some("<script>"));
        assert!(html.contains(r#"<p class="notice">&lt;script&gt;</p>"#));
        let html = dashboard("admin", &[], Some("no-speech"));
        assert!(html.contains("No speech was recognized"));
    }
}
