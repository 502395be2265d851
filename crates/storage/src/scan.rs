#![forbid(unsafe_code)]

use super::*;
use tt_core::model::{BlockRef, ContainingPage, PageRefs};

struct ScanRow {
    page_uid: String,
    page_title: String,
    block_uid: String,
    text: Option<String>,
    containing_uid: Option<String>,
    containing_title: Option<String>,
}

impl SqliteStore {
    /// Full re-scan of a workspace: every page with at least one
    /// tag-marking block, grouped per page, ordered by title then uid so
    /// repeated scans of the same graph yield identical output.
    pub fn scan_tag_refs(&self, workspace: &WorkspaceId) -> Result<Vec<PageRefs>, StoreError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT p.uid, p.title, b.uid, b.text, cp.uid, cp.title
            FROM block_refs r
            JOIN pages p ON p.workspace = r.workspace AND p.uid = r.page_uid
            JOIN blocks b ON b.workspace = r.workspace AND b.uid = r.block_uid
            LEFT JOIN pages cp ON cp.workspace = r.workspace AND cp.uid = b.page_uid
            WHERE r.workspace = ?1
            ORDER BY p.title ASC, p.uid ASC, b.uid ASC
            "#,
        )?;
        let rows = stmt.query_map(params![workspace.as_str()], |row| {
            Ok(ScanRow {
                page_uid: row.get(0)?,
                page_title: row.get(1)?,
                block_uid: row.get(2)?,
                text: row.get(3)?,
                containing_uid: row.get(4)?,
                containing_title: row.get(5)?,
            })
        })?;

        let mut records: Vec<PageRefs> = Vec::new();
        for row in rows {
            let row = row?;
            let Some(text) = row.text.as_deref() else {
                continue;
            };
            if !refs::has_tag_mark(text, &row.page_title) {
                continue;
            }
            let reference = BlockRef {
                block_uid: row.block_uid,
                text: row.text,
                page: match (row.containing_uid, row.containing_title) {
                    (Some(uid), Some(title)) => Some(ContainingPage { uid, title }),
                    _ => None,
                },
            };
            match records.last_mut() {
                Some(last) if last.page_uid == row.page_uid => last.refs.push(reference),
                _ => records.push(PageRefs {
                    page_uid: row.page_uid,
                    title: row.page_title,
                    refs: vec![reference],
                }),
            }
        }
        Ok(records)
    }
}
