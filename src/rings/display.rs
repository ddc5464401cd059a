use super::{Form, Polynomial, RnsPoly};
use std::fmt;

impl fmt::Display for Polynomial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // `{:#}` prints the COEFF-form polynomial as a sum of monomials
        if f.alternate() && self.form() == Form::Coeff {
            return fmt_expanded(self.coeffs(), f);
        }
        let num = f.precision().unwrap_or(3);
        write!(
            f,
            "Poly<{}, q={}, {}>",
            self.degree(),
            self.modulus(),
            form_tag(self.form())
        )?;
        fmt_truncated(self.coeffs(), num, f)
    }
}

impl fmt::Display for RnsPoly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let num = f.precision().unwrap_or(3);
        write!(f, "RnsPoly<{}, {}>{{", self.degree(), form_tag(self.form()))?;
        for (i, c) in self.components().iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: ", c.modulus())?;
            fmt_truncated(c.coeffs(), num, f)?;
        }
        write!(f, "}}")
    }
}

pub(crate) fn form_tag(form: Form) -> &'static str {
    match form {
        Form::Coeff => "coeff",
        Form::Ntt => "ntt",
    }
}

/// First `num` and last `num` entries.
fn fmt_truncated(coeffs: &[i64], num: usize, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let len = coeffs.len();
    write!(f, "[")?;
    if len <= num * 2 {
        for (i, c) in coeffs.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{c}")?;
        }
    } else {
        for (i, c) in coeffs[..num].iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{c}")?;
        }
        write!(f, ", …")?;
        for c in &coeffs[len - num..] {
            write!(f, ", {c}")?;
        }
    }
    write!(f, "]")
}

fn fmt_expanded(coeffs: &[i64], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if coeffs.iter().all(|&c| c == 0) {
        return write!(f, "0");
    }
    let mut first = true;
    for (i, &c) in coeffs.iter().enumerate() {
        if c == 0 {
            continue;
        }
        if !first {
            write!(f, " + ")?;
        }
        first = false;
        match (i, c) {
            (0, _) => write!(f, "{c}")?,
            (1, 1) => write!(f, "x")?,
            (1, _) => write!(f, "{c}*x")?,
            (_, 1) => write!(f, "x^{i}")?,
            _ => write!(f, "{c}*x^{i}")?,
        }
    }
    Ok(())
}
