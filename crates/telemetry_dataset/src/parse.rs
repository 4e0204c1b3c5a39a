//! Parsing of serialized array cells such as `[[0.1, nan, 3], [4 5 6]]`.

/// A parsed array cell. One-dimensional cells report a single row.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayCell {
    pub rows: usize,
    pub cols: usize,
    pub values: Vec<f32>,
}

/// Parse a bracketed numeric array of rank 0, 1 or 2.
///
/// Elements may be separated by commas and/or whitespace; `nan`/`inf` are accepted.
/// Ragged two-dimensional arrays, several top-level arrays and values that sit
/// outside the rows of a two-dimensional array are rejected.
pub fn parse_array(raw: &str) -> Result<ArrayCell, String> {
    let mut values = Vec::new();
    let mut row_lens = Vec::new();
    let mut depth = 0usize;
    let mut max_depth = 0usize;
    let mut row_start = 0usize;
    let mut outer_arrays = 0usize;
    let mut token = String::new();

    for ch in raw.chars() {
        match ch {
            '[' => {
                flush(&mut token, &mut values)?;
                if depth == 0 {
                    outer_arrays += 1;
                    if outer_arrays > 1 {
                        return Err("more than one top-level array".into());
                    }
                }
                depth += 1;
                if depth > 2 {
                    return Err("arrays deeper than two dimensions are not supported".into());
                }
                max_depth = max_depth.max(depth);
                row_start = values.len();
            }
            ']' => {
                flush(&mut token, &mut values)?;
                if depth == 0 {
                    return Err("unbalanced `]`".into());
                }
                if depth == 2 || max_depth == 1 {
                    row_lens.push(values.len() - row_start);
                }
                depth -= 1;
            }
            ',' => flush(&mut token, &mut values)?,
            c if c.is_whitespace() => flush(&mut token, &mut values)?,
            c => token.push(c),
        }
    }
    flush(&mut token, &mut values)?;
    if depth != 0 {
        return Err("unbalanced `[`".into());
    }
    if values.is_empty() {
        return Err("empty array".into());
    }
    if max_depth == 0 {
        return Ok(ArrayCell {
            rows: 1,
            cols: values.len(),
            values,
        });
    }

    let cols = row_lens[0];
    if row_lens.iter().any(|len| *len != cols) {
        return Err(format!("ragged rows: {row_lens:?}"));
    }
    if values.len() != row_lens.len() * cols {
        return Err(format!(
            "{} values outside the {}x{cols} rows",
            values.len() - row_lens.len() * cols,
            row_lens.len()
        ));
    }
    Ok(ArrayCell {
        rows: row_lens.len(),
        cols,
        values,
    })
}

fn flush(token: &mut String, values: &mut Vec<f32>) -> Result<(), String> {
    if token.is_empty() {
        return Ok(());
    }
    let value = token
        .parse::<f32>()
        .map_err(|e| format!("invalid number `{token}`: {e}"))?;
    values.push(value);
    token.clear();
    Ok(())
}
