use crate::eval::types::Value;

fn escape_str(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

fn pr_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

impl Value {
    /// Printed form: strings quoted and escaped.
    pub fn pr_str(&self) -> String {
        self.render(true)
    }

    /// Display form used by `str`: strings verbatim.
    pub fn to_display(&self) -> String {
        self.render(false)
    }

    fn render(&self, readably: bool) -> String {
        match self {
            Value::Nil => String::from("nil"),
            Value::Bool(true) => String::from("true"),
            Value::Bool(false) => String::from("false"),
            Value::Number(n) => pr_number(*n),
            Value::Symbol(s) => s.clone(),
            Value::Str(s) if readably => format!("\"{}\"", escape_str(s)),
            Value::Str(s) => s.clone(),
            Value::List(items) => {
                let strs: Vec<String> = items.iter().map(|x| x.render(readably)).collect();
                format!("({})", strs.join(" "))
            }
            Value::Map(fields) => {
                let strs: Vec<String> = fields
                    .iter()
                    .map(|(k, v)| format!("{} {}", k, v.render(readably)))
                    .collect();
                format!("{{{}}}", strs.join(", "))
            }
            Value::Func(func) => format!("<Func {}>", func.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    #[test]
    fn strings_are_escaped_when_printed() {
        let value = Value::Str("say \"hi\"\\\n".to_string());
        assert_eq!(value.pr_str(), r#""say \"hi\"\\\n""#);
        assert_eq!(value.to_display(), "say \"hi\"\\\n");
    }

    #[test]
    fn integral_numbers_print_without_fraction() {
        assert_eq!(Value::Number(3.0).pr_str(), "3");
        assert_eq!(Value::Number(-0.5).pr_str(), "-0.5");
    }

    #[test]
    fn maps_print_sorted_fields() {
        let mut fields = BTreeMap::new();
        fields.insert("name".to_string(), Value::Str("demo".to_string()));
        fields.insert("age".to_string(), Value::Number(2.0));
        assert_eq!(
            Value::Map(Arc::new(fields)).pr_str(),
            r#"{age 2, name "demo"}"#
        );
    }
}
