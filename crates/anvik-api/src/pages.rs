//! HTML pages shown in the browser after an OAuth round trip.

/// Chat the pages link back to.
pub const BOT_URL: &str = "https://t.me/AnvikAssistant_Bot";
pub const BOT_HANDLE: &str = "@AnvikAssistant_Bot";

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Page with a heading, a message and a button back to the bot.
pub fn render(title: &str, message: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
<style>
body {{ font-family: system-ui, sans-serif; background: #f4f6fb; display: flex; align-items: center; justify-content: center; min-height: 100vh; margin: 0; }}
.card {{ background: #fff; border-radius: 12px; padding: 2rem 2.5rem; box-shadow: 0 4px 16px rgba(0,0,0,.08); text-align: center; max-width: 420px; }}
a.button {{ display: inline-block; margin-top: 1.5rem; padding: .75rem 1.5rem; border-radius: 8px; background: #229ed9; color: #fff; text-decoration: none; }}
</style>
</head>
<body>
<div class="card">
<h1>{title}</h1>
<p>{message}</p>
<a class="button" href="{url}">Return to {handle}</a>
</div>
</body>
</html>
"#,
        title = escape(title),
        message = escape(message),
        url = BOT_URL,
        handle = BOT_HANDLE,
    )
}

pub fn google_success() -> String {
    render("Login Successful!", "✅ Google connected. You can now return to Telegram.")
}

pub fn notion_success() -> String {
    render("Login Successful!", "✅ Notion connected. You can now return to Telegram.")
}

pub fn failure(service: &str) -> String {
    render(
        "Login Failed",
        &format!(
            "❌ An error occurred while connecting your {} account. Please try again.",
            service
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pages_link_back_to_bot() {
        let page = google_success();
        assert!(page.contains("<h1>Login Successful!</h1>"));
        assert!(page.contains(BOT_URL));
        assert!(failure("Google").contains("connecting your Google account"));
    }

    #[test]
    fn test_escapes_markup() {
        let page = render("<b>", "a & b");
        assert!(page.contains("<title>&lt;b&gt;</title>"));
        assert!(page.contains("a &amp; b"));
    }
}
