use std::path::{Path, PathBuf};

use super::entry::{EntryId, MediaEntry, MediaInfo};
use crate::error::ProbeError;

/// Emitted after every playlist mutation with the post-mutation row count.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowCountChanged(pub usize);

/// Columns the playlist view can show, named by the `meta_tags` setting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Column {
    Title,
    FileName,
    Path,
    Duration,
    Resolution,
    FrameRate,
    Spherical,
    /// Any other container tag.
    Tag(String),
}

impl Column {
    pub fn from_tag_name(name: &str) -> Self {
        match name {
            "title" => Column::Title,
            "file_name" => Column::FileName,
            "path" => Column::Path,
            "duration" => Column::Duration,
            "resolution" => Column::Resolution,
            "frame_rate" => Column::FrameRate,
            "spherical" => Column::Spherical,
            other => Column::Tag(other.to_string()),
        }
    }

    pub fn header(&self) -> String {
        match self {
            Column::Title => "Title".into(),
            Column::FileName => "File".into(),
            Column::Path => "Path".into(),
            Column::Duration => "Duration".into(),
            Column::Resolution => "Resolution".into(),
            Column::FrameRate => "FPS".into(),
            Column::Spherical => "360°".into(),
            Column::Tag(name) => name.clone(),
        }
    }
}

/// Ordered container of media entries. Rows are always contiguous `0..len`.
pub struct PlaylistModel {
    entries: Vec<MediaEntry>,
    next_id: u64,
}

impl PlaylistModel {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 0,
        }
    }

    pub fn row_count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry_at(&self, row: usize) -> Option<&MediaEntry> {
        self.entries.get(row)
    }

    pub fn entries(&self) -> &[MediaEntry] {
        &self.entries
    }

    pub fn row_of(&self, id: EntryId) -> Option<usize> {
        self.entries.iter().position(|e| e.id() == id)
    }

    pub fn get(&self, id: EntryId) -> Option<&MediaEntry> {
        self.entries.iter().find(|e| e.id() == id)
    }

    /// Append an entry built from already-probed metadata.
    pub fn append(&mut self, path: PathBuf, info: MediaInfo) -> (EntryId, RowCountChanged) {
        let id = self.allocate_id();
        self.entries.push(MediaEntry::new(id, path, info));
        (id, RowCountChanged(self.entries.len()))
    }

    /// Probe each path once and append it. Paths that fail to probe are still
    /// added with unknown metadata; loading decides what to do with them.
    pub fn add_paths(
        &mut self,
        paths: &[PathBuf],
        probe: &dyn Fn(&Path) -> Result<MediaInfo, ProbeError>,
    ) -> Option<RowCountChanged> {
        if paths.is_empty() {
            return None;
        }
        for path in paths {
            let info = match probe(path) {
                Ok(info) => info,
                Err(e) => {
                    log::warn!("Failed to probe {}: {e}", path.display());
                    MediaInfo::unknown()
                }
            };
            let id = self.allocate_id();
            self.entries.push(MediaEntry::new(id, path.clone(), info));
        }
        log::info!("Added {} entries to playlist", paths.len());
        Some(RowCountChanged(self.entries.len()))
    }

    /// Remove `count` rows starting at `start`. Out-of-range parts are ignored.
    pub fn remove_rows(&mut self, start: usize, count: usize) -> Option<RowCountChanged> {
        if start >= self.entries.len() || count == 0 {
            return None;
        }
        let end = start.saturating_add(count).min(self.entries.len());
        self.entries.drain(start..end);
        Some(RowCountChanged(self.entries.len()))
    }

    /// Remove an arbitrary set of rows as a single mutation.
    pub fn remove_indices(&mut self, rows: &[usize]) -> Option<RowCountChanged> {
        let len = self.entries.len();
        let mut rows: Vec<usize> = rows.iter().copied().filter(|&r| r < len).collect();
        if rows.is_empty() {
            return None;
        }
        rows.sort_unstable();
        rows.dedup();
        for row in rows.into_iter().rev() {
            self.entries.remove(row);
        }
        Some(RowCountChanged(self.entries.len()))
    }

    /// Move the row at `from` so that it ends up at index `to`.
    pub fn move_row(&mut self, from: usize, to: usize) -> Option<RowCountChanged> {
        let len = self.entries.len();
        if from >= len || to >= len || from == to {
            return None;
        }
        let entry = self.entries.remove(from);
        self.entries.insert(to, entry);
        Some(RowCountChanged(len))
    }

    /// Display text for one table cell.
    pub fn cell(&self, row: usize, column: &Column) -> Option<String> {
        let entry = self.entries.get(row)?;
        let info = entry.info();
        match column {
            Column::Title => Some(entry.display_title()),
            Column::FileName => Some(entry.file_name()),
            Column::Path => Some(entry.path().display().to_string()),
            Column::Duration => Some(format_duration(info.duration_seconds)),
            Column::Resolution => info
                .has_dimensions()
                .then(|| format!("{}x{}", info.width, info.height)),
            Column::FrameRate => (info.avg_frame_rate > 0.0)
                .then(|| format!("{:.2}", info.avg_frame_rate)),
            Column::Spherical => Some(if entry.is_spherical() { "yes" } else { "no" }.into()),
            Column::Tag(name) => info.tags.get(name).cloned(),
        }
    }

    fn allocate_id(&mut self) -> EntryId {
        let id = EntryId(self.next_id);
        self.next_id += 1;
        id
    }
}

impl Default for PlaylistModel {
    fn default() -> Self {
        Self::new()
    }
}

/// `m:ss`, or `h:mm:ss` for an hour or more.
pub fn format_duration(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.round() as u64
    } else {
        0
    };
    let (h, m, s) = (total / 3600, (total / 60) % 60, total % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m}:{s:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(w: u32, h: u32, secs: f64) -> MediaInfo {
        MediaInfo {
            width: w,
            height: h,
            duration_seconds: secs,
            avg_frame_rate: 30.0,
            ..MediaInfo::unknown()
        }
    }

    fn model_with(names: &[&str]) -> PlaylistModel {
        let mut m = PlaylistModel::new();
        for n in names {
            let _ = m.append(PathBuf::from(format!("/media/{n}")), info(1920, 960, 2.0));
        }
        m
    }

    fn names(m: &PlaylistModel) -> Vec<String> {
        m.entries().iter().map(|e| e.file_name()).collect()
    }

    #[test]
    fn append_reports_new_count_and_unique_ids() {
        let mut m = PlaylistModel::new();
        let (a, c1) = m.append("/a.mp4".into(), info(1, 1, 1.0));
        let (b, c2) = m.append("/a.mp4".into(), info(1, 1, 1.0));
        assert_eq!(c1, RowCountChanged(1));
        assert_eq!(c2, RowCountChanged(2));
        assert_ne!(a, b, "duplicate paths get distinct ids");
        assert_eq!(m.row_of(b), Some(1));
    }

    #[test]
    fn add_paths_probes_once_per_path() {
        let calls = std::cell::Cell::new(0);
        let probe = |p: &Path| -> Result<MediaInfo, ProbeError> {
            calls.set(calls.get() + 1);
            if p.ends_with("bad.mp4") {
                Err(ProbeError::NoVideoStream)
            } else {
                Ok(info(100, 50, 3.0))
            }
        };
        let mut m = PlaylistModel::new();
        let change = m.add_paths(&["/x/ok.mp4".into(), "/x/bad.mp4".into()], &probe);
        assert_eq!(change, Some(RowCountChanged(2)));
        assert_eq!(calls.get(), 2);
        assert!(m.entry_at(0).unwrap().info().has_dimensions());
        assert!(!m.entry_at(1).unwrap().info().has_dimensions());
        assert_eq!(m.add_paths(&[], &probe), None);
    }

    #[test]
    fn remove_rows_clamps_and_keeps_order() {
        let mut m = model_with(&["a", "b", "c", "d"]);
        assert_eq!(m.remove_rows(1, 2), Some(RowCountChanged(2)));
        assert_eq!(names(&m), ["a", "d"]);
        assert_eq!(m.remove_rows(1, 10), Some(RowCountChanged(1)));
        assert_eq!(m.remove_rows(5, 1), None);
        assert_eq!(m.remove_rows(0, 0), None);
    }

    #[test]
    fn remove_indices_is_one_mutation() {
        let mut m = model_with(&["a", "b", "c", "d", "e"]);
        assert_eq!(m.remove_indices(&[3, 0, 3, 9]), Some(RowCountChanged(3)));
        assert_eq!(names(&m), ["b", "c", "e"]);
        assert_eq!(m.remove_indices(&[7]), None);
    }

    #[test]
    fn move_row_both_directions() {
        let mut m = model_with(&["a", "b", "c", "d"]);
        assert_eq!(m.move_row(0, 2), Some(RowCountChanged(4)));
        assert_eq!(names(&m), ["b", "c", "a", "d"]);
        assert_eq!(m.move_row(3, 0), Some(RowCountChanged(4)));
        assert_eq!(names(&m), ["d", "b", "c", "a"]);
        assert_eq!(m.move_row(1, 1), None);
        assert_eq!(m.move_row(1, 4), None);
    }

    #[test]
    fn ids_survive_reorder() {
        let mut m = model_with(&["a", "b", "c"]);
        let id = m.entry_at(0).unwrap().id();
        let _ = m.move_row(0, 2);
        assert_eq!(m.row_of(id), Some(2));
        assert_eq!(m.get(id).unwrap().file_name(), "a");
    }

    #[test]
    fn cells_format_metadata() {
        let mut m = PlaylistModel::new();
        let mut i = info(3840, 1920, 3725.0);
        i.spherical = true;
        i.tags.insert("artist".into(), "Someone".into());
        let _ = m.append("/v/dive.mp4".into(), i);
        assert_eq!(m.cell(0, &Column::Resolution).as_deref(), Some("3840x1920"));
        assert_eq!(m.cell(0, &Column::Duration).as_deref(), Some("1:02:05"));
        assert_eq!(m.cell(0, &Column::FrameRate).as_deref(), Some("30.00"));
        assert_eq!(m.cell(0, &Column::Spherical).as_deref(), Some("yes"));
        assert_eq!(m.cell(0, &Column::Title).as_deref(), Some("dive.mp4"));
        assert_eq!(
            m.cell(0, &Column::from_tag_name("artist")).as_deref(),
            Some("Someone")
        );
        assert_eq!(m.cell(0, &Column::Tag("album".into())), None);
        assert_eq!(m.cell(1, &Column::Title), None);
    }

    #[test]
    fn format_duration_short_and_long() {
        assert_eq!(format_duration(0.0), "0:00");
        assert_eq!(format_duration(62.4), "1:02");
        assert_eq!(format_duration(f64::NAN), "0:00");
        assert_eq!(format_duration(3600.0), "1:00:00");
    }
}
