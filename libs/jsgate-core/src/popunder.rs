//! Popunder campaigns: settings validation, slugs and the generated body.

use url::Url;

use crate::error::InvalidCampaignError;
use crate::model::PopunderSettings;
use crate::secondary::escape_js_single_quoted;

const MAX_SLUG_LEN: usize = 200;

/// Checks operator-supplied settings and returns them with the target URL
/// trimmed.
pub fn validate_settings(
    settings: &PopunderSettings,
) -> Result<PopunderSettings, InvalidCampaignError> {
    let target = settings.target_url.trim();
    if target.is_empty() {
        return Err(InvalidCampaignError {
            reason: "target_url is required",
        });
    }
    match Url::parse(target) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.host_str().is_some() => {}
        _ => {
            return Err(InvalidCampaignError {
                reason: "target_url must be an http(s) URL",
            });
        }
    }
    if settings.frequency == 0 {
        return Err(InvalidCampaignError {
            reason: "frequency must be at least 1",
        });
    }
    if settings.width == Some(0) || settings.height == Some(0) {
        return Err(InvalidCampaignError {
            reason: "window size must be positive",
        });
    }

    Ok(PopunderSettings {
        target_url: target.to_string(),
        ..settings.clone()
    })
}

/// Lower-case ASCII slug with runs of anything else collapsed to `-`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.trim().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug: String = slug.trim_matches('-').chars().take(MAX_SLUG_LEN).collect();
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        "campaign".to_string()
    } else {
        slug.to_string()
    }
}

fn js_number(v: Option<u32>) -> String {
    v.map_or_else(|| "0".to_string(), |n| n.to_string())
}

/// Body served to an allowed domain. Opens the target behind the page on the
/// first click, capped per visitor through `localStorage`.
pub fn render(campaign_id: i64, settings: &PopunderSettings) -> String {
    format!(
        "(function(){{\
var c={{u:'{url}',n:{freq},p:{period},d:{delay},w:{width},h:{height}}};\
var k='jsgate_popunder_{id}';var s;\
try{{s=JSON.parse(localStorage.getItem(k)||'[]');}}catch(e){{s=[];}}\
var now=Date.now();s=s.filter(function(t){{return now-t<c.p;}});\
if(s.length>=c.n)return;\
function popunder(){{document.removeEventListener('click',popunder,true);\
setTimeout(function(){{\
var f=c.w&&c.h?'width='+c.w+',height='+c.h:'';\
var w=window.open(c.u,'_blank',f);\
if(!w)return;\
try{{w.blur();window.focus();}}catch(e){{}}\
s.push(now);try{{localStorage.setItem(k,JSON.stringify(s));}}catch(e){{}}\
}},c.d);}}\
document.addEventListener('click',popunder,true);\
}})();",
        url = escape_js_single_quoted(&settings.target_url),
        freq = settings.frequency,
        period = settings.frequency_unit.millis(),
        delay = settings.delay,
        width = js_number(settings.width),
        height = js_number(settings.height),
        id = campaign_id,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FrequencyUnit;

    fn settings(target: &str) -> PopunderSettings {
        PopunderSettings {
            target_url: target.to_string(),
            frequency: 2,
            frequency_unit: FrequencyUnit::Hour,
            delay: 500,
            width: Some(1024),
            height: Some(768),
        }
    }

    #[test]
    fn target_url_is_required_and_must_be_http() {
        for bad in ["", "   ", "not a url", "ftp://files.example.com", "javascript:alert(1)"] {
            assert!(validate_settings(&settings(bad)).is_err(), "{bad:?}");
        }
        let ok = validate_settings(&settings("  https://example.com/landing ")).unwrap();
        assert_eq!(ok.target_url, "https://example.com/landing");
    }

    #[test]
    fn zero_frequency_and_size_are_rejected() {
        let mut s = settings("https://example.com");
        s.frequency = 0;
        assert_eq!(
            validate_settings(&s).unwrap_err().reason,
            "frequency must be at least 1"
        );

        let mut s = settings("https://example.com");
        s.width = Some(0);
        assert!(validate_settings(&s).is_err());
    }

    #[test]
    fn slugs_are_url_safe() {
        assert_eq!(slugify("Test Campaign"), "test-campaign");
        assert_eq!(slugify("  Spring -- Sale!! 2026 "), "spring-sale-2026");
        assert_eq!(slugify("***"), "campaign");
        assert_eq!(slugify(&"x".repeat(300)).len(), 200);
    }

    #[test]
    fn body_carries_target_and_cap() {
        let body = render(7, &settings("https://target.com/?a=1&b='2'"));
        assert!(body.contains("u:'https://target.com/?a=1&b=\\'2\\''"));
        assert!(body.contains("n:2,p:3600000,d:500,w:1024,h:768"));
        assert!(body.contains("jsgate_popunder_7"));
        assert!(body.starts_with("(function(){"));
        assert!(body.ends_with("})();"));
    }

    #[test]
    fn missing_size_opens_default_window() {
        let mut s = settings("https://target.com");
        s.width = None;
        s.height = None;
        assert!(render(1, &s).contains("w:0,h:0"));
    }
}
