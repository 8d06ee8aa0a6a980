use crate::entity::registration;

const HEADERS: [&str; 9] = [
    "Name",
    "Email",
    "Phone",
    "Roll",
    "Team",
    "Members",
    "Status",
    "Registration Date",
    "Attended",
];

fn push_field(out: &mut String, value: &str) {
    if value.contains([',', '"', '\n', '\r']) {
        out.push('"');
        out.push_str(&value.replace('"', "\"\""));
        out.push('"');
    } else {
        out.push_str(value);
    }
}

fn push_row<'a>(out: &mut String, fields: impl IntoIterator<Item = &'a str>) {
    for (i, field) in fields.into_iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        push_field(out, field);
    }
    out.push_str("\r\n");
}

fn members(r: &registration::Model) -> String {
    [
        (&r.member1_name, &r.member1_roll),
        (&r.member2_name, &r.member2_roll),
    ]
    .into_iter()
    .filter_map(|(name, roll)| Some(format!("{} ({})", name.as_deref()?, roll.as_deref()?)))
    .collect::<Vec<_>>()
    .join("; ")
}

/// Render registrations as RFC 4180 CSV with a header row.
pub fn registrations_csv(rows: &[registration::Model]) -> String {
    let mut out = String::new();
    push_row(&mut out, HEADERS);

    for r in rows {
        let members = members(r);
        let registered = r.registered_at.format("%Y-%m-%d %H:%M:%S UTC").to_string();
        push_row(
            &mut out,
            [
                r.name.as_str(),
                r.email.as_str(),
                r.phone.as_deref().unwrap_or_default(),
                r.roll.as_deref().unwrap_or_default(),
                r.team_name.as_deref().unwrap_or_default(),
                members.as_str(),
                r.status.as_str(),
                registered.as_str(),
                if r.attended { "Yes" } else { "No" },
            ],
        );
    }

    out
}

/// File-name friendly form of an event title.
pub fn slug(title: &str) -> String {
    let mut slug = String::new();
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        "event".to_owned()
    } else {
        slug.to_owned()
    }
}
