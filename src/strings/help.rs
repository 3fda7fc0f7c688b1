//! # Help Text
//!
//! Usage summary shown by `!cuhz help`.

pub fn main(dashboard_url: &str) -> String {
    format!(
        concat!(
            "Use: !chain <prompt> | Verify: !cuhz verify <CODE> | Dashboard: {} | ",
            "Mods: !cuhz status, !cuhz queue on|off, !cuhz next, !cuhz cooldown <sec>, ",
            "!cuhz safe on|off, !cuhz lockdown on|off"
        ),
        dashboard_url
    )
}
