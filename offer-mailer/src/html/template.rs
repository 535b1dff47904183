//! Offer email HTML template.
//!
//! Table-based layout with inline styles, since most mail clients ignore
//! `<style>` blocks.

use crate::dispatch::Campaign;
use crate::util::headers::unsubscribe_url;

use super::escape::escape_html;

const FONT: &str = "font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif;";

/// Produces the message body for one recipient of a campaign.
pub trait Renderer: Send + Sync {
    fn render(&self, campaign: &Campaign, recipient: &str) -> String;
}

/// Company-branded offer template.
#[derive(Debug, Clone)]
pub struct OfferTemplate {
    pub company_name: String,
    pub reply_to: String,
    pub contact_url: String,
    pub unsubscribe_base_url: String,
}

impl Renderer for OfferTemplate {
    fn render(&self, campaign: &Campaign, recipient: &str) -> String {
        let title = escape_html(&campaign.title);
        let company = escape_html(&self.company_name);
        let description = escape_html(&campaign.description).replace('\n', "<br>");
        let unsubscribe = unsubscribe_url(&self.unsubscribe_base_url, recipient);

        format!(
            r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>{title}</title>
</head>
<body style="margin: 0; padding: 0; -webkit-text-size-adjust: 100%; -ms-text-size-adjust: 100%;">
  <div style="display: none; max-height: 0; overflow: hidden; font-size: 1px; line-height: 1px; opacity: 0;">
    {title} - Product news from {company}
  </div>
  <table cellpadding="0" cellspacing="0" border="0" width="100%" style="background-color: #f8f9fa; padding: 20px 0;">
    <tr>
      <td align="center">
        <table cellpadding="0" cellspacing="0" border="0" width="600" style="max-width: 600px; background-color: white; border-radius: 12px;">
          <tr>
            <td style="padding: 30px;">
              <h1 style="color: #2c3e50; text-align: center; border-bottom: 2px solid #3498db; padding-bottom: 15px; margin: 0 0 25px 0; font-size: 24px; {FONT}">{title}</h1>
              {images}
              <div style="font-size: 16px; line-height: 1.6; color: #333; margin: 20px 0; text-align: center; {FONT}">{description}</div>
              {price}
              {cta}
              {footer}
            </td>
          </tr>
        </table>
      </td>
    </tr>
  </table>
</body>
</html>
"#,
            images = image_section(&campaign.image_urls(), &company),
            price = price_section(campaign.price.as_deref()),
            cta = self.cta_section(campaign.cta.as_deref()),
            footer = self.footer(&unsubscribe),
        )
    }
}

impl OfferTemplate {
    fn cta_section(&self, cta: Option<&str>) -> String {
        let Some(label) = cta.map(str::trim).filter(|label| !label.is_empty()) else {
            return String::new();
        };
        format!(
            r#"<table cellpadding="0" cellspacing="0" border="0" width="100%" style="margin: 30px 0;">
                <tr><td align="center">
                  <a href="{href}" target="_blank" style="background-color: #3498db; color: white; padding: 12px 30px; text-decoration: none; border-radius: 25px; font-weight: bold; display: inline-block; {FONT}">{label}</a>
                </td></tr>
              </table>"#,
            href = escape_html(&self.contact_url),
            label = escape_html(label),
        )
    }

    fn footer(&self, unsubscribe: &str) -> String {
        let company = escape_html(&self.company_name);
        let reply_to = escape_html(&self.reply_to);
        format!(
            r#"<div style="margin-top: 30px; padding-top: 20px; border-top: 1px solid #eee; font-size: 14px; color: #666; text-align: center; {FONT}">
                <p style="margin: 10px 0;"><strong>{company}</strong></p>
                <p style="margin: 10px 0;">Contact us for more information</p>
                <div style="margin-top: 20px; padding-top: 15px; border-top: 1px solid #ddd; font-size: 12px; color: #888;">
                  <p style="margin: 10px 0;">You are receiving this email because you expressed interest in our services.</p>
                  <p style="margin: 10px 0;">
                    <a href="{unsubscribe}" style="color: #666; text-decoration: underline;">Unsubscribe</a> |
                    <a href="mailto:{reply_to}?subject=Privacy%20Policy" style="color: #666; text-decoration: underline;">Privacy Policy</a>
                  </p>
                  <p style="margin-top: 10px;">{company}<br>Email: {reply_to}</p>
                </div>
              </div>"#,
            unsubscribe = escape_html(unsubscribe),
        )
    }
}

/// Price box, or a "contact us" box when no price is given.
fn price_section(price: Option<&str>) -> String {
    let inner = match price.map(str::trim).filter(|price| !price.is_empty()) {
        Some(price) => format!(
            r#"<div style="font-size: 14px; color: #495057; margin-bottom: 8px; font-weight: 500;">PRODUCT PRICE</div>
                      <div style="color: #495057; font-size: 24px; font-weight: bold; margin: 5px 0;">€{}</div>
                      <div style="color: #495057; font-size: 16px; font-weight: 600;">(excl. VAT)</div>"#,
            escape_html(price)
        ),
        None => r#"<div style="color: #495057; font-size: 18px; font-weight: 600;">Contact us for pricing</div>"#
            .to_string(),
    };
    format!(
        r#"<table cellpadding="0" cellspacing="0" border="0" width="100%" style="margin: 25px 0;">
                <tr><td align="center">
                  <div style="background-color: #f8f9fa; border: 1px solid #dee2e6; border-radius: 8px; padding: 20px; text-align: center; {FONT}">
                      {inner}
                  </div>
                </td></tr>
              </table>"#
    )
}

/// Image grid: one large image, or rows of two or three thumbnails.
fn image_section(urls: &[&str], company: &str) -> String {
    match urls.len() {
        0 => String::new(),
        1 => format!(
            r#"<table cellpadding="0" cellspacing="0" border="0" width="100%" style="margin: 20px 0;">
                <tr><td align="center">{}</td></tr>
              </table>"#,
            image_tag(urls[0], &format!("Product offer from {}", company), 500)
        ),
        count => {
            let (columns, width) = if count == 2 { (2, 280) } else { (3, 180) };
            let mut rows = String::new();
            for (row, chunk) in urls.chunks(columns).enumerate() {
                rows.push_str("<tr>");
                for (col, url) in chunk.iter().enumerate() {
                    let alt = format!("Product offer {} from {}", row * columns + col + 1, company);
                    rows.push_str(&format!(
                        r#"<td align="center" style="padding: 10px;">{}</td>"#,
                        image_tag(url, &alt, width)
                    ));
                }
                rows.push_str("</tr>");
            }
            format!(
                r#"<table cellpadding="0" cellspacing="0" border="0" width="100%" style="margin: 20px 0;">{}</table>"#,
                rows
            )
        }
    }
}

fn image_tag(url: &str, alt: &str, width: u32) -> String {
    let height = (width as f64 * 0.75).round() as u32;
    format!(
        r#"<img src="{src}" alt="{alt}" width="{width}" height="{height}" style="max-width: 100%; width: {width}px; height: {height}px; border-radius: 8px; display: block; border: none; outline: none; object-fit: cover;" />"#,
        src = escape_html(url),
    )
}
