//! Message templates and the token renderer.
//!
//! Templates use `{token}` placeholders. Rendering is a single pass, so
//! values that happen to contain braces are copied through untouched.

use std::collections::HashMap;

use crate::models::{Company, HiringSignal};

/// Invite note templates, keyed by angle.
pub const INVITE_TEMPLATES: &[(&str, &str)] = &[
    (
        "peer",
        "Hi {first_name}, I noticed {company_name}'s work in {industry} here in {city}. Would love to connect and learn more about what you're building. Always great to meet fellow local tech leaders!",
    ),
    (
        "curiosity",
        "Hi {first_name}, came across {company_name} while researching {industry} around {home_city}. Your approach looks interesting and I'd love to connect and learn more about your journey.",
    ),
    (
        "usecase",
        "Hi {first_name}, researching {industry} companies in {home_city} and {company_name} stood out. Would love to connect and exchange perspectives on the space.",
    ),
    (
        "local",
        "Hi {first_name}, fellow {home_city} tech person here! Noticed {company_name} and wanted to connect. Always looking to build relationships in our local ecosystem.",
    ),
];

/// InMail bodies (everything before the sign-off), keyed by angle.
pub const INMAIL_BODIES: &[(&str, &str)] = &[
    (
        "peer",
        "Hi {first_name},\n\nI noticed {company_name} and the work you're doing in the {industry} space here in {city}. As someone who's been following the local tech scene, it's exciting to see companies like yours making an impact.\n\n{personalization}\n\nI'd love to learn more about what you're building and see if there might be an opportunity to connect. No agenda, just genuinely curious about {company_name}'s journey and where you're headed.\n\nWould you be open to a quick chat sometime? Even 15 minutes would be great.",
    ),
    (
        "curiosity",
        "Hi {first_name},\n\nI came across {company_name} while researching {industry} companies around {home_city}, and I'm genuinely curious about your approach.\n\n{personalization}\n\nWhat caught my attention was {hook}. I'd love to hear more about how you're thinking about this space and where {company_name} is headed.\n\nIf you have a few minutes for a brief call, I'd really appreciate the chance to learn from your perspective. No pitch, just looking to understand the landscape better.",
    ),
    (
        "usecase",
        "Hi {first_name},\n\nI've been researching {industry} companies in the {home_city} area, and {company_name} stood out.\n\n{personalization}\n\nI'm exploring how companies like yours are tackling {use_case_area}, and I think there might be some interesting parallels worth discussing.\n\nWould you be open to a 15-minute conversation? I promise to keep it focused and valuable for both of us.",
    ),
    (
        "local",
        "Hi {first_name},\n\nAs a fellow member of the {home_city} tech community, I wanted to reach out and connect.\n\nI've been following {company_name}'s growth, and it's great to see local companies thriving in the {industry} space. {personalization}\n\nI'm always looking to build relationships with others in our local ecosystem. Would you be open to grabbing a coffee or hopping on a quick call sometime?",
    ),
];

/// InMail sign-offs, keyed by angle.
pub const INMAIL_CLOSINGS: &[(&str, &str)] = &[
    ("peer", "Best,\n{sender_name}\n\nP.S. {ps_line}"),
    ("curiosity", "Thanks for considering,\n{sender_name}"),
    ("usecase", "Best regards,\n{sender_name}"),
    (
        "local",
        "Looking forward to potentially connecting,\n{sender_name}\n\nP.S. Love seeing {home_city} companies succeed!",
    ),
];

/// Context paragraphs appended, in order, to InMails that render short.
pub const PADDING_PARAGRAPHS: &[&str] = &[
    "A little about me: I spend a lot of time talking with founders and engineering leaders about how they build, hire, and grow, and I always come away learning something new from teams doing interesting work in {industry}.",
    "I'm not reaching out with a pitch. I'd simply like to hear how {company_name} thinks about the next stage of growth and what has worked well for the team so far, and I'm happy to share what I've seen from other companies along the way.",
    "If a call doesn't fit your schedule right now, a short reply with a good time later in the quarter works just as well. I know inboxes get busy and I appreciate you taking the time to read this.",
    "Either way, I'm glad to see more {industry} teams building in and around {home_city}, and I hope we get a chance to compare notes soon.",
];

pub const PS_LINES: &[&str] = &[
    "Always happy to make introductions to others in the local ecosystem if helpful.",
    "If this isn't a good time, no worries. Feel free to connect anyway.",
    "I know these messages can get lost, so happy to follow up if that's easier.",
    "Let me know if there's a better way to reach you.",
];

const CURIOSITY_HOOKS: &[(&str, &str)] = &[
    ("Software", "your approach to building scalable solutions"),
    ("AI/ML", "how you're applying AI/ML in practical ways"),
    ("HealthTech", "your work at the intersection of health and technology"),
    ("FinTech", "your approach to financial technology innovation"),
    ("Cybersecurity", "your take on modern security challenges"),
    ("Data Analytics", "how you're helping companies make sense of their data"),
    ("Technology", "your innovative approach to solving real problems"),
];
const DEFAULT_HOOK: &str = "your unique approach in this space";

const USE_CASES: &[(&str, &str)] = &[
    ("software", "modern software development practices"),
    ("ai/ml", "practical AI implementation"),
    ("healthtech", "healthcare technology adoption"),
    ("fintech", "financial technology innovation"),
    ("cybersecurity", "security in the modern threat landscape"),
    ("data analytics", "data-driven decision making"),
];
const DEFAULT_USE_CASE: &str = "innovation in your space";

pub fn lookup<'a>(table: &'a [(&str, &'a str)], key: &str) -> Option<&'a str> {
    table.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

/// Personalization line from the company's activity, then its hiring signal.
pub fn personalization(company: &Company) -> String {
    let activity = company.recent_activity.to_lowercase();
    let has = |words: &[&str]| words.iter().any(|w| activity.contains(w));

    if has(&["funding", "series", "raised"]) {
        "Congrats on the recent funding! That's a big milestone.".to_string()
    } else if has(&["expansion", "new office"]) {
        format!(
            "I noticed the expansion news. Exciting times for {}.",
            company.name
        )
    } else if has(&["launch"]) {
        "Saw the recent launch. Looks like you've been busy!".to_string()
    } else if company.hiring_signal == HiringSignal::Yes {
        "I see you're growing the team, which is always an exciting (and challenging!) phase."
            .to_string()
    } else {
        format!(
            "I've been impressed by what I've seen from {} so far.",
            company.name
        )
    }
}

pub fn curiosity_hook(industry: &str) -> &'static str {
    lookup(CURIOSITY_HOOKS, industry).unwrap_or(DEFAULT_HOOK)
}

pub fn use_case_area(industry: &str) -> &'static str {
    lookup(USE_CASES, &industry.to_lowercase()).unwrap_or(DEFAULT_USE_CASE)
}

/// PS line chosen from the company id, so redrafting gives the same line.
pub fn ps_line(company_id: i64) -> &'static str {
    PS_LINES[company_id.rem_euclid(PS_LINES.len() as i64) as usize]
}

/// Substitute `{token}` placeholders. Unknown tokens are left as written.
pub fn render(template: &str, vars: &HashMap<&str, String>) -> String {
    let mut out = String::with_capacity(template.len() + 64);
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                let key = &after[..close];
                match vars.get(key) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push('{');
                        out.push_str(key);
                        out.push('}');
                    }
                }
                rest = &after[close + 1..];
            }
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}
