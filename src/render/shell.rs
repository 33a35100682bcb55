// src/render/shell.rs
use super::RenderOptions;

const STYLESHEET: &str = r#"body {
    font-family: 'Noto Sans KR', -apple-system, BlinkMacSystemFont, 'Segoe UI', Arial, sans-serif;
    line-height: 1.8;
    color: #333;
    background-color: #f5f5f5;
}
.container {
    max-width: 800px;
    margin: 0 auto;
    padding: 50px 30px;
    background-color: white;
    box-shadow: 0 2px 20px rgba(0,0,0,0.1);
}
.header {
    font-size: 14px;
    color: #95a5a6;
    text-transform: uppercase;
    letter-spacing: 2px;
    text-align: center;
}
h1, h2, h3, h4 { color: #2c3e50; margin-top: 30px; font-weight: 700; }
h1 { border-bottom: 3px solid #3498db; padding-bottom: 20px; font-size: 36px; text-align: center; }
h2 { font-size: 28px; color: #34495e; margin-top: 50px; }
h3 { font-size: 24px; border-left: 4px solid #3498db; padding-left: 15px; margin-top: 40px; }
h4 { font-size: 20px; color: #34495e; }
p { margin: 20px 0; text-align: justify; font-size: 16px; color: #444; }
strong { color: #e74c3c; font-weight: 600; }
code { background-color: #f0f3f5; padding: 2px 6px; border-radius: 3px; font-family: Menlo, Consolas, monospace; }
li.task { list-style-type: none; }
a { color: #3498db !important; text-decoration: none; border-bottom: 1px dotted #3498db; }
.reference-section { margin-top: 60px; padding: 30px; background-color: #f8f9fa; border-left: 4px solid #3498db; border-radius: 5px; }
.reference-section h3 { margin-top: 0; border: none; padding: 0; }
.reference-section li { margin: 10px 0; word-break: break-all; }
.footer { margin-top: 70px; padding-top: 30px; border-top: 2px solid #ecf0f1; font-size: 14px; color: #95a5a6; text-align: center; }
.footer p { text-align: center; font-size: 14px; color: #95a5a6; }"#;

/// Embeds body and references into the fixed document.
pub(super) fn wrap(options: &RenderOptions, body: &str, references: &str) -> String {
    let title = html_escape::encode_text(&options.title);
    let header = if options.title.is_empty() {
        String::new()
    } else {
        format!("<div class=\"header\">{title}</div>\n")
    };
    let footer: String = options
        .footer
        .iter()
        .map(|line| format!("<p>{}</p>\n", html_escape::encode_text(line)))
        .collect();

    format!(
        "<!DOCTYPE html>
<html>
<head>
<meta charset=\"UTF-8\">
<title>{title}</title>
<style>
{STYLESHEET}
</style>
</head>
<body>
<div class=\"container\">
{header}{body}
{references}
<div class=\"footer\">
{footer}</div>
</div>
</body>
</html>
"
    )
}
