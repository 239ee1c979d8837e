// metadata.opf sidecar writer. Open Packaging Format 2.0, the layout
// audiobookshelf's scanner expects. Element presence matters: optional
// elements are omitted entirely rather than written empty.

use crate::metadata::BookMetadata;
use std::path::Path;

/// Render the OPF document for a book
pub fn render_opf(md: &BookMetadata) -> String {
    let mut doc = String::new();

    doc.push_str("<?xml version='1.0' encoding='utf-8'?>\n");
    doc.push_str("<ns0:package xmlns:dc='http://purl.org/dc/elements/1.1/' xmlns:ns0='http://www.idpf.org/2007/opf' unique-identifier='BookId' version='2.0'>\n");
    doc.push_str("  <ns0:metadata xmlns:dc=\"http://purl.org/dc/elements/1.1/\"\n");
    doc.push_str("          xmlns:opf=\"http://www.idpf.org/2007/opf\">\n");

    doc.push_str(&format!("\t<dc:title>{}</dc:title>\n", escape_xml(&md.title)));

    if let Some(subtitle) = &md.subtitle {
        doc.push_str(&format!(
            "\t<dc:subtitle>{}</dc:subtitle>\n",
            escape_xml(subtitle)
        ));
    }

    doc.push_str(&format!(
        "\t<dc:description>{}</dc:description>\n",
        escape_xml(&md.summary)
    ));

    for author in &md.authors {
        doc.push_str(&format!(
            "\t<dc:creator opf:role=\"aut\">{}</dc:creator>\n",
            escape_xml(&author.name)
        ));
    }

    for narrator in &md.narrators {
        doc.push_str(&format!(
            "\t<dc:creator opf:role=\"nrt\">{}</dc:creator>\n",
            escape_xml(&narrator.name)
        ));
    }

    doc.push_str(&format!(
        "\t<dc:publisher>{}</dc:publisher>\n",
        escape_xml(&md.publisher_name)
    ));

    doc.push_str("\t<dc:language>eng</dc:language>\n");

    for genre in &md.genres {
        doc.push_str(&format!(
            "\t<dc:subject>{}</dc:subject>\n",
            escape_xml(&genre.name)
        ));
    }

    if let Some(isbn) = &md.isbn {
        doc.push_str(&format!(
            "\t<dc:identifier opf:scheme=\"ISBN\">{}</dc:identifier>\n",
            escape_xml(isbn)
        ));
    }

    doc.push_str(&format!(
        "\t<dc:identifier opf:scheme=\"ASIN\">{}</dc:identifier>\n",
        escape_xml(&md.asin)
    ));

    if let Some(series) = &md.primary_series {
        doc.push_str(&format!(
            "\t<ns0:meta name=\"calibre:series\" content=\"{}\" />\n",
            escape_xml(&series.name)
        ));

        if let Some(position) = &series.position {
            doc.push_str(&format!(
                "\t<ns0:meta name=\"calibre:series_index\" content=\"{}\" />\n",
                escape_xml(position)
            ));
        }
    }

    // Always present, even when there is nothing to tag; audiobookshelf's
    // scanner tolerates it empty
    doc.push_str("\t<dc:tag></dc:tag>\n");

    doc.push_str("  </ns0:metadata>\n");
    doc.push_str("</ns0:package>\n");

    doc
}

/// Write the OPF sidecar. Create-write-close; a crash may leave a partial
/// file, which is acceptable because the torrent stays untagged and the
/// import is retried.
pub async fn write_opf(md: &BookMetadata, path: &Path) -> Result<(), std::io::Error> {
    tokio::fs::write(path, render_opf(md)).await
}

fn escape_xml(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
