use chrono::{Datelike, NaiveDate};

/// Values interpolated into the confirmation message.
#[derive(Debug, Clone)]
pub struct ConfirmationContext<'a> {
    pub club_name: &'a str,
    pub recipient_name: &'a str,
    pub event_title: &'a str,
    pub event_date: NaiveDate,
    pub events_url: &'a str,
    pub support_email: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// "Saturday, March 1st, 2025"
pub fn long_date(date: NaiveDate) -> String {
    let day = date.day();
    let suffix = match (day % 10, day % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!(
        "{}, {} {day}{suffix}, {}",
        date.format("%A"),
        date.format("%B"),
        date.year()
    )
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn render_confirmation(ctx: &ConfirmationContext<'_>) -> RenderedMessage {
    let subject = format!("Registration Successful \u{2013} {}", ctx.club_name);
    let date = long_date(ctx.event_date);

    let text = format!(
        "You're Officially Registered!\n\n\
         Hi {name},\n\n\
         Thank you for registering for {event}! We're excited to have you join us.\n\n\
         Event Details:\n\
         Date: {date}\n\n\
         View event details: {url}\n\n\
         See you at the event!\n\
         - The {club} Team\n\n\
         For any inquiries, email us at {support}\n",
        name = ctx.recipient_name,
        event = ctx.event_title,
        url = ctx.events_url,
        club = ctx.club_name,
        support = ctx.support_email,
    );

    let club = escape_html(ctx.club_name);
    let url = escape_html(ctx.events_url);
    let support = escape_html(ctx.support_email);
    let html = format!(
        r#"<!DOCTYPE html>
<html>
  <head><meta charset="utf-8"><title>{subject}</title></head>
  <body style="background-color:#f6f9fc;font-family:Arial,sans-serif;margin:0;padding:24px">
    <div style="max-width:600px;margin:0 auto;background:#ffffff;border-radius:8px;padding:32px">
      <div style="font-size:28px;font-weight:bold;color:#0f172a">{club}</div>
      <h1 style="font-size:22px;color:#111827">You're Officially Registered!</h1>
      <p>Hi <strong>{name}</strong>,</p>
      <p>Thank you for registering for <strong>{event}</strong>! We're excited to have you join us.</p>
      <p><strong>Event Details:</strong></p>
      <p><strong>Date:</strong> {date}</p>
      <p><a href="{url}" style="display:inline-block;background:#2563eb;color:#ffffff;padding:12px 20px;border-radius:6px;text-decoration:none">View Event Details</a></p>
      <hr style="border:none;border-top:1px solid #e5e7eb;margin:24px 0">
      <p style="color:#6b7280;font-size:14px">See you at the event!<br><strong>- The {club} Team</strong></p>
      <p style="color:#6b7280;font-size:14px">For any inquiries, email us at <a href="mailto:{support}">{support}</a></p>
    </div>
  </body>
</html>
"#,
        subject = escape_html(&subject),
        name = escape_html(ctx.recipient_name),
        event = escape_html(ctx.event_title),
    );

    RenderedMessage {
        subject,
        html,
        text,
    }
}
