use axum::{
    http::header,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::models::{ExportFormat, ReportError};

/// A rendered report served as a download.
#[derive(Debug)]
pub struct Attachment {
    pub filename: String,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl IntoResponse for Attachment {
    fn into_response(self) -> Response {
        (
            [
                (header::CONTENT_TYPE, self.content_type.to_string()),
                (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", self.filename)),
            ],
            self.body,
        )
            .into_response()
    }
}

/// Header line from the row's field names, then one line per row.
pub fn render_csv<T: Serialize>(rows: &[T]) -> Result<Vec<u8>, ReportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer.serialize(row).map_err(|e| ReportError::Export(e.to_string()))?;
    }
    writer.into_inner().map_err(|e| ReportError::Export(e.to_string()))
}

/// Renders `rows` as `<stem>.csv` or `<stem>.json`. Nothing to export is `NoData`.
pub fn attachment<T: Serialize>(stem: &str, format: ExportFormat, rows: &[T]) -> Result<Attachment, ReportError> {
    if rows.is_empty() {
        return Err(ReportError::NoData);
    }

    match format {
        ExportFormat::Csv => Ok(Attachment {
            filename: format!("{}.csv", stem),
            content_type: "text/csv; charset=utf-8",
            body: render_csv(rows)?,
        }),
        ExportFormat::Json => Ok(Attachment {
            filename: format!("{}.json", stem),
            content_type: "application/json",
            body: serde_json::to_vec_pretty(rows).map_err(|e| ReportError::Export(e.to_string()))?,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[derive(Serialize)]
    struct Row {
        id: i64,
        name: String,
        cost: Option<f64>,
    }

    #[test]
    fn csv_quotes_fields_and_leaves_none_empty() {
        let rows = vec![
            Row { id: 1, name: "Ahmadi, Sara".to_string(), cost: Some(12.5) },
            Row { id: 2, name: "Ali".to_string(), cost: None },
        ];

        let text = String::from_utf8(render_csv(&rows).unwrap()).unwrap();
        assert_eq!(text, "id,name,cost\n1,\"Ahmadi, Sara\",12.5\n2,Ali,\n");
    }

    #[test]
    fn empty_export_is_no_data() {
        let rows: Vec<Row> = Vec::new();
        assert_matches!(attachment("patients", ExportFormat::Csv, &rows), Err(ReportError::NoData));
    }

    #[test]
    fn json_attachment_is_named_after_format() {
        let rows = vec![Row { id: 1, name: "Ali".to_string(), cost: None }];
        let file = attachment("factors_report", ExportFormat::Json, &rows).unwrap();
        assert_eq!(file.filename, "factors_report.json");
        assert_eq!(file.content_type, "application/json");
    }
}
