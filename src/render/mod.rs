//! Message template rendering.
//!
//! Pure token substitution; no I/O and no failure modes. Tokens missing a
//! context value render as neutral filler text. Custom templates that omit
//! the personal-message or donate-URL token still get that section appended
//! after the body so personalization always reaches the donor.

/// Substitutable tokens, written as `{{name}}` in template text.
pub const TOKEN_ATHLETE_NAME: &str = "{{athlete_name}}";
pub const TOKEN_TEAM_NAME: &str = "{{team_name}}";
pub const TOKEN_CAMPAIGN_NAME: &str = "{{campaign_name}}";
pub const TOKEN_DONATE_URL: &str = "{{donate_url}}";
pub const TOKEN_PERSONAL_MESSAGE: &str = "{{personal_message}}";

/// Built-in fallback body used when neither the athlete nor the org has a
/// template configured.
pub const DEFAULT_TEMPLATE: &str = "Hi,\n\n\
{{athlete_name}} is raising money for {{team_name}} through the \
{{campaign_name}} campaign, and every contribution makes a difference.\n\n\
{{personal_message}}\n\n\
You can donate here: {{donate_url}}\n\n\
Thank you for your support!";

/// Built-in fallback subject.
pub const DEFAULT_SUBJECT: &str = "Support {{athlete_name}} and {{team_name}}";

/// Values substituted into a template.
#[derive(Debug, Clone, Default)]
pub struct RenderContext {
    pub athlete_name: Option<String>,
    pub team_name: Option<String>,
    pub campaign_name: Option<String>,
    pub donate_url: Option<String>,
    pub personal_message: Option<String>,
}

impl RenderContext {
    fn athlete_name(&self) -> &str {
        self.athlete_name.as_deref().unwrap_or("our athlete")
    }

    fn team_name(&self) -> &str {
        self.team_name.as_deref().unwrap_or("our team")
    }

    fn campaign_name(&self) -> &str {
        self.campaign_name.as_deref().unwrap_or("our fundraiser")
    }

    fn donate_url(&self) -> &str {
        self.donate_url.as_deref().unwrap_or("")
    }

    fn personal_message(&self) -> &str {
        self.personal_message.as_deref().unwrap_or("")
    }
}

/// Render a message body.
///
/// Substitutes every token, then appends the personal message and the
/// donate URL when the template did not place them itself.
pub fn render_body(template: &str, ctx: &RenderContext) -> String {
    let has_personal = template.contains(TOKEN_PERSONAL_MESSAGE);
    let has_url = template.contains(TOKEN_DONATE_URL);

    let mut body = substitute(template, ctx);

    if !has_personal && !ctx.personal_message().is_empty() {
        body.push_str("\n\n");
        body.push_str(ctx.personal_message());
    }
    if !has_url && !ctx.donate_url().is_empty() {
        body.push_str("\n\nDonate here: ");
        body.push_str(ctx.donate_url());
    }

    body
}

/// Render a subject line. Subjects substitute tokens but never grow
/// appended sections.
pub fn render_subject(template: &str, ctx: &RenderContext) -> String {
    substitute(template, ctx)
}

fn substitute(template: &str, ctx: &RenderContext) -> String {
    template
        .replace(TOKEN_ATHLETE_NAME, ctx.athlete_name())
        .replace(TOKEN_TEAM_NAME, ctx.team_name())
        .replace(TOKEN_CAMPAIGN_NAME, ctx.campaign_name())
        .replace(TOKEN_DONATE_URL, ctx.donate_url())
        .replace(TOKEN_PERSONAL_MESSAGE, ctx.personal_message())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> RenderContext {
        RenderContext {
            athlete_name: Some("Jordan Reyes".into()),
            team_name: Some("Westfield Track".into()),
            campaign_name: Some("Spring Sprint".into()),
            donate_url: Some("https://donate.example/spring/jordan".into()),
            personal_message: Some("It means a lot to me personally.".into()),
        }
    }

    #[test]
    fn test_substitutes_all_tokens() {
        let body = render_body(DEFAULT_TEMPLATE, &ctx());
        assert!(body.contains("Jordan Reyes"));
        assert!(body.contains("Westfield Track"));
        assert!(body.contains("Spring Sprint"));
        assert!(body.contains("https://donate.example/spring/jordan"));
        assert!(body.contains("It means a lot to me personally."));
        assert!(!body.contains("{{"));
    }

    #[test]
    fn test_missing_context_renders_filler() {
        let body = render_body(DEFAULT_TEMPLATE, &RenderContext::default());
        assert!(body.contains("our athlete"));
        assert!(body.contains("our team"));
        assert!(!body.contains("{{"));
    }

    #[test]
    fn test_appends_sections_custom_template_left_out() {
        let body = render_body("Please give to {{campaign_name}}.", &ctx());
        assert!(body.contains("Spring Sprint"));
        // Personalization still shows up even though the template had no
        // token for it.
        assert!(body.contains("It means a lot to me personally."));
        assert!(body.contains("Donate here: https://donate.example/spring/jordan"));
    }

    #[test]
    fn test_no_duplicate_sections_when_tokens_present() {
        let body = render_body(DEFAULT_TEMPLATE, &ctx());
        assert_eq!(body.matches("https://donate.example/spring/jordan").count(), 1);
        assert_eq!(body.matches("It means a lot").count(), 1);
    }

    #[test]
    fn test_render_is_deterministic() {
        let a = render_body(DEFAULT_TEMPLATE, &ctx());
        let b = render_body(DEFAULT_TEMPLATE, &ctx());
        assert_eq!(a, b);
    }

    #[test]
    fn test_subject_never_appends() {
        let subject = render_subject("Quick note from {{athlete_name}}", &ctx());
        assert_eq!(subject, "Quick note from Jordan Reyes");
    }
}
