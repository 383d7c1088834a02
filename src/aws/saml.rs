use crate::aws::AwsRole;
use crate::errors::BmxError;
use anyhow::Result;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;

const ROLE_ATTRIBUTE_NAME: &str = "https://aws.amazon.com/SAML/Attributes/Role";

/// Pulls the base64 SAML assertion out of the Okta AWS app login page.
///
/// The page is not well-formed HTML, so this is a fixed pattern match on the
/// single `<input name="SAMLResponse" ... value="...">` element rather than a
/// general HTML parse. Attribute order varies between Okta page revisions,
/// so both orderings are tried.
pub fn extract_saml_from_login_page(html: &str) -> Result<String> {
    let patterns = [
        r#"<input[^>]*name="SAMLResponse"[^>]*value="([^"]*)""#,
        r#"<input[^>]*value="([^"]*)"[^>]*name="SAMLResponse""#,
    ];

    for pattern in patterns {
        let re = Regex::new(pattern).expect("pattern is valid");
        if let Some(captures) = re.captures(html) {
            let value = captures.get(1).expect("pattern has one group").as_str();
            return Ok(decode_html_entities(value));
        }
    }

    Err(BmxError::SamlParse(String::from("could not find SAMLResponse in the login page")).into())
}

/// The login page HTML-escapes the assertion value. Only the entities that
/// can occur in base64 text need mapping back.
fn decode_html_entities(value: &str) -> String {
    value
        .replace("&#x2b;", "+")
        .replace("&#43;", "+")
        .replace("&#x3d;", "=")
        .replace("&#61;", "=")
        .replace("&#x2f;", "/")
        .replace("&#47;", "/")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
}

/// Decodes a base64 SAML2 assertion and returns its AWS roles in document
/// order.
///
/// Each `AttributeValue` under the Role attribute holds
/// `"<principal-arn>,<role-arn>"`; the last `/` segment of the role ARN is
/// the human-readable role name.
pub fn extract_roles_from_saml(encoded_saml: &str) -> Result<Vec<AwsRole>> {
    let decoded = STANDARD
        .decode(encoded_saml)
        .map_err(|e| BmxError::SamlParse(format!("SAML response is not valid base64: {e}")))?;
    let xml = String::from_utf8(decoded)
        .map_err(|e| BmxError::SamlParse(format!("SAML response is not valid utf-8: {e}")))?;

    let mut reader = Reader::from_str(xml.as_str());

    let mut roles = vec![];
    let mut saw_role_attribute = false;
    let mut in_role_attribute = false;
    let mut in_attribute_value = false;
    let mut current_value = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"Attribute" => {
                    let name = e
                        .try_get_attribute("Name")
                        .map_err(|e| BmxError::SamlParse(format!("invalid SAML XML: {e}")))?
                        .map(|attr| attr.unescape_value().unwrap_or_default().to_string());
                    in_role_attribute = name.as_deref() == Some(ROLE_ATTRIBUTE_NAME);
                    saw_role_attribute |= in_role_attribute;
                }
                b"AttributeValue" if in_role_attribute => {
                    in_attribute_value = true;
                    current_value.clear();
                }
                _ => {}
            },
            Ok(Event::Text(e)) if in_attribute_value => {
                let text = e
                    .unescape()
                    .map_err(|e| BmxError::SamlParse(format!("invalid SAML XML: {e}")))?;
                current_value.push_str(text.as_ref());
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"AttributeValue" if in_attribute_value => {
                    in_attribute_value = false;
                    roles.push(parse_role(current_value.trim())?);
                }
                b"Attribute" => in_role_attribute = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(BmxError::SamlParse(format!("invalid SAML XML: {e}")).into());
            }
            _ => {}
        }
    }

    if !saw_role_attribute {
        return Err(
            BmxError::SamlParse(String::from("no role attribute in the SAML response")).into(),
        );
    }

    Ok(roles)
}

fn parse_role(value: &str) -> Result<AwsRole> {
    let parts: Vec<&str> = value.split(',').collect();
    let [principal_arn, role_arn] = parts.as_slice() else {
        return Err(BmxError::SamlParse(format!(
            "unexpected role attribute value in the SAML response: {value}"
        ))
        .into());
    };

    let role_name = role_arn.rsplit('/').next().unwrap_or(role_arn).to_string();

    Ok(AwsRole {
        role_name,
        principal_arn: principal_arn.to_string(),
        role_arn: role_arn.to_string(),
    })
}
