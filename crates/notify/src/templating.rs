//! Minijinja template rendering for notification messages.
//!
//! Three messages are rendered: the shift-start notice, the periodic
//! reminder, and the upcoming-weekend announcement. Each has a built-in
//! default that can be replaced from configuration. Templates are
//! arbitrary strings, so a fresh [`minijinja::Environment`] is created per
//! render call.

use crate::traits::NotifyError;

pub const DEFAULT_SHIFT_START: &str =
    "🔔 **Your shift starts now!** You're on duty until **{{ end }}**.";

pub const DEFAULT_REMINDER: &str = "⏰ **Shift reminder** — you're on duty until **{{ end }}**.";

pub const DEFAULT_HEADS_UP: &str = "📅 **{{ title }} On-Call ({{ date_range }})**
🔄 Rotation: **{{ group }}**

**Schedule:**
{% for slot in slots %}• {{ slot.who }} — {{ slot.start }} → {{ slot.end }}
{% endfor %}";

/// Context for shift-start and reminder messages.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ShiftMessageContext {
    pub holder: String,
    /// Shift end rendered in the recipient's zone (`3:00 AM EST`).
    pub end: String,
    /// Same instant as RFC 3339.
    pub end_iso: String,
    /// Recipient's IANA zone.
    pub timezone: String,
    pub is_weekend_shift: bool,
}

/// Context for the upcoming-weekend announcement.
#[derive(Debug, Clone, serde::Serialize)]
pub struct HeadsUpContext {
    /// `Upcoming Weekend` or `Current Weekend`.
    pub title: String,
    pub group: String,
    pub date_range: String,
    pub slots: Vec<SlotContext>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct SlotContext {
    pub holder: String,
    /// Mention when the holder is on the roster, otherwise the bold holder name.
    pub who: String,
    pub start: String,
    pub end: String,
}

/// The template strings in use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageTemplates {
    pub shift_start: String,
    pub reminder: String,
    pub heads_up: String,
}

impl Default for MessageTemplates {
    fn default() -> Self {
        Self {
            shift_start: DEFAULT_SHIFT_START.to_string(),
            reminder: DEFAULT_REMINDER.to_string(),
            heads_up: DEFAULT_HEADS_UP.to_string(),
        }
    }
}

impl MessageTemplates {
    /// Check all three templates parse.
    pub fn validate(&self, renderer: &TemplateRenderer) -> Result<(), NotifyError> {
        renderer.validate(&self.shift_start)?;
        renderer.validate(&self.reminder)?;
        renderer.validate(&self.heads_up)?;
        Ok(())
    }
}

/// Renders notification templates using minijinja.
#[derive(Debug, Default)]
pub struct TemplateRenderer {
    _private: (),
}

impl TemplateRenderer {
    pub fn new() -> Self {
        Self { _private: () }
    }

    fn build_env() -> minijinja::Environment<'static> {
        let mut env = minijinja::Environment::new();
        env.add_filter("upper", upper_filter);
        env.add_filter("lower", lower_filter);
        env
    }

    /// Render a template string with any serializable context.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Template`] if the template is invalid or
    /// rendering fails.
    pub fn render<S: serde::Serialize>(
        &self,
        template_str: &str,
        ctx: &S,
    ) -> Result<String, NotifyError> {
        let env = Self::build_env();
        env.render_str(template_str, ctx)
            .map_err(|e| NotifyError::Template(e.to_string()))
    }

    /// Check template syntax without evaluating it.
    pub fn validate(&self, template_str: &str) -> Result<(), NotifyError> {
        let env = Self::build_env();
        env.template_from_str(template_str)
            .map_err(|e| NotifyError::Template(e.to_string()))?;
        Ok(())
    }
}

fn lower_filter(value: String) -> String {
    value.to_lowercase()
}

fn upper_filter(value: String) -> String {
    value.to_uppercase()
}
