use scraper::{Html, Selector};

use super::field::{classify, FieldRole, Stage};

/// Input fields of an HTML page, in document order.
///
/// Names are unique: when a name shows up twice the later value replaces
/// the earlier one, keeping the position of the first.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Form {
    fields: Vec<(String, String)>,
}

impl Form {
    /// Collects every `<input>` of the document. Inputs without a `name` are
    /// kept under the empty name, inputs without a `value` get an empty one.
    pub fn from_html(document: &str) -> Self {
        let doc = Html::parse_document(document);
        let selector = Selector::parse("input").expect("static selector");

        let mut form = Form::default();
        for input in doc.select(&selector) {
            let element = input.value();

            form.insert(
                element.attr("name").unwrap_or(""),
                element.attr("value").unwrap_or(""),
            );
        }

        trace!("Form::from_html fields={}", form.len());
        form
    }

    pub fn insert(&mut self, name: &str, value: &str) {
        match self.fields.iter_mut().find(|(n, _)| n.as_str() == name) {
            Some(field) => field.1 = value.into(),
            None => self.fields.push((name.into(), value.into())),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n.as_str() == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    /// Builds the payload to post back. Every field is sent: the ones `answer`
    /// has a value for get that value, the others keep what the page declared.
    pub fn fill<'a, F>(&'a self, stage: Stage, answer: F) -> Vec<(String, String)>
    where
        F: Fn(FieldRole) -> Option<&'a str>,
    {
        self.fields
            .iter()
            .map(|(name, value)| {
                let role = classify(name, stage);
                trace!("Form::fill {} => {:?}", name, role);

                let value = answer(role).unwrap_or(value.as_str());
                (name.clone(), value.to_owned())
            })
            .collect()
    }
}

/// Value of the `SAMLResponse` input, if the page has a non-empty one.
pub fn extract_saml_response(document: &str) -> Option<String> {
    Form::from_html(document)
        .get("SAMLResponse")
        .filter(|v| !v.is_empty())
        .map(|v| v.into())
}
