//! URL parameter contract: reading the tenant from a URL and carrying it onto
//! internal navigation links so deep links stay tenant-consistent.

use url::{Url, form_urlencoded};

use crm_core::TenantId;

use crate::TenancyError;

/// Query parameter that names the tenant.
pub const DEFAULT_TENANT_PARAM: &str = "cliente_id";

/// An href split into path, query and fragment, each kept verbatim.
struct HrefParts<'a> {
    path: &'a str,
    query: Option<&'a str>,
    fragment: Option<&'a str>,
}

impl<'a> HrefParts<'a> {
    fn split(href: &'a str) -> Self {
        let (rest, fragment) = match href.split_once('#') {
            Some((rest, fragment)) => (rest, Some(fragment)),
            None => (href, None),
        };
        let (path, query) = match rest.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (rest, None),
        };
        Self {
            path,
            query,
            fragment,
        }
    }
}

/// Whether `href` leaves the app: it has a scheme, or names a host (`//host`).
fn is_external(href: &str) -> Result<bool, TenancyError> {
    let mut lead = href.chars().take(2);
    if lead.next().is_some_and(is_slash) && lead.next().is_some_and(is_slash) {
        return Ok(true);
    }

    match Url::parse(href) {
        Ok(_) => Ok(true),
        Err(url::ParseError::RelativeUrlWithoutBase) => Ok(false),
        Err(e) => Err(TenancyError::InvalidLink {
            href: href.to_string(),
            reason: e.to_string(),
        }),
    }
}

// Browsers read a backslash as a slash in the authority position.
fn is_slash(c: char) -> bool {
    c == '/' || c == '\\'
}

/// Decoded key of one `key=value` query segment.
fn segment_key(segment: &str) -> Option<String> {
    form_urlencoded::parse(segment.as_bytes())
        .next()
        .map(|(key, _)| key.into_owned())
}

/// Tenant named by `param` in an absolute URL or relative href.
///
/// Blank values are ignored; the first occurrence wins.
pub fn tenant_from_query(href: &str, param: &str) -> Option<TenantId> {
    let query = HrefParts::split(href).query?;
    form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == param)
        .and_then(|(_, value)| TenantId::new(value.as_ref()).ok())
}

/// Rewrite an internal link so it carries `tenant` in `param`.
///
/// Any existing value is replaced; `None` removes the parameter. Only the
/// query changes: the path (relative or not), the other parameters and the
/// fragment are kept as written. Links with a scheme or a host point outside
/// the app and are returned unchanged.
pub fn scoped_link(
    href: &str,
    param: &str,
    tenant: Option<&TenantId>,
) -> Result<String, TenancyError> {
    if is_external(href)? {
        return Ok(href.to_string());
    }

    let parts = HrefParts::split(href);
    let mut segments: Vec<String> = parts
        .query
        .into_iter()
        .flat_map(|query| query.split('&'))
        .filter(|segment| !segment.is_empty())
        .filter(|segment| segment_key(segment).as_deref() != Some(param))
        .map(str::to_string)
        .collect();

    if let Some(tenant) = tenant {
        segments.push(
            form_urlencoded::Serializer::new(String::new())
                .append_pair(param, tenant.as_str())
                .finish(),
        );
    }

    let mut out = parts.path.to_string();
    if !segments.is_empty() {
        out.push('?');
        out.push_str(&segments.join("&"));
    }
    if let Some(fragment) = parts.fragment {
        out.push('#');
        out.push_str(fragment);
    }
    Ok(out)
}
