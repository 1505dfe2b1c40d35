/// Maps a byte offset to a 1-based `(line, column)` pair.
/// The offset is matched against `char_indices`, so it may fall anywhere in the
/// text; the column counts characters, so multi-byte text does not shift it.
pub fn line_and_column(source: &str, position: usize) -> (usize, usize) {
    let mut line = 1;
    let mut column = 1;
    for (i, c) in source.char_indices() {
        if i >= position {
            break;
        }
        if c == '\n' {
            line += 1;
            column = 1;
        } else {
            column += 1;
        }
    }
    (line, column)
}

/// Short description of a value's type, used in error messages.
pub(crate) fn describe(value: &crate::value::Value) -> &'static str {
    use crate::value::Value;
    match value {
        Value::String(_) => "a string",
        Value::Number(_) => "a number",
        Value::Boolean(_) => "a boolean",
        Value::Null => "null",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
