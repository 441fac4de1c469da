/// Format a value for compact human-readable output.
pub trait FormatValue {
    fn format_value(&self) -> String;
}

impl FormatValue for f32 {
    fn format_value(&self) -> String {
        format!("{:.2}", self)
    }
}

macro_rules! impl_format_display {
    ($($ty:ty),+ $(,)?) => {
        $(impl FormatValue for $ty {
            fn format_value(&self) -> String {
                self.to_string()
            }
        })+
    };
}

impl_format_display!(i32, bool);

/// Format a slice with head/tail truncation.
pub fn format_truncated<T: FormatValue>(data: &[T]) -> String {
    let len = data.len();
    if len == 0 {
        return "{}".to_string();
    }
    if len <= 4 {
        let joined = data
            .iter()
            .map(FormatValue::format_value)
            .collect::<Vec<_>>()
            .join(", ");
        return format!("{{{}}}", joined);
    }
    format!(
        "{{{}, {} ... {}, {}}}",
        data[0].format_value(),
        data[1].format_value(),
        data[len - 2].format_value(),
        data[len - 1].format_value()
    )
}
