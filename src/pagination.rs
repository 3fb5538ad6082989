//! Pagination – splits a flat list of positioned boxes into pages.
//!
//! Handles:
//! - page boundaries for any page size and margins
//! - forced breaks (`page-break-before` / `page-break-after`)
//! - headings that must stay on the page of the content they introduce

use crate::layout::PositionedBox;
use crate::layout_config::*;

/// Physical page size and the vertical margins, all in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub margin_top: f32,
    pub margin_bottom: f32,
}

impl PageGeometry {
    pub fn content_height(&self) -> f32 {
        self.height - self.margin_top - self.margin_bottom
    }
}

/// Convert positioned boxes into a paginated LayoutConfig.
pub fn paginate(boxes: &[PositionedBox], geometry: &PageGeometry, title: &str) -> LayoutConfig {
    let mut config = LayoutConfig {
        title: title.to_string(),
        page_width_pt: geometry.width,
        page_height_pt: geometry.height,
        pages: Vec::new(),
        images: Default::default(),
    };
    let content_height = geometry.content_height();

    let mut current_page = PageLayout {
        page_index: 0,
        boxes: Vec::new(),
    };

    // Document-space y at which the current page begins, so that
    // `pbox.y - page_start_doc_y` is the y-on-page of any box.
    let mut page_start_doc_y = 0.0f32;

    for (i, pbox) in boxes.iter().enumerate() {
        if pbox.page_break_before && !current_page.boxes.is_empty() {
            config.pages.push(current_page);
            current_page = PageLayout {
                page_index: config.pages.len(),
                boxes: Vec::new(),
            };
            page_start_doc_y = pbox.y;
        }

        let group_end = keep_group_end(boxes, i);
        let group_bottom = (group_end.y + group_end.height - page_start_doc_y).max(0.0);

        if group_bottom > content_height && !current_page.boxes.is_empty() {
            config.pages.push(current_page);
            current_page = PageLayout {
                page_index: config.pages.len(),
                boxes: Vec::new(),
            };
            page_start_doc_y = pbox.y;
        }

        let y_on_page = (pbox.y - page_start_doc_y).max(0.0);
        for item in &pbox.items {
            let mut placed = item.clone();
            placed.y += geometry.margin_top + y_on_page;
            current_page.boxes.push(placed);
        }
    }

    if !current_page.boxes.is_empty() {
        config.pages.push(current_page);
    }
    if config.pages.is_empty() {
        config.pages.push(PageLayout {
            page_index: 0,
            boxes: Vec::new(),
        });
    }
    config
}

/// Last box of the keep-with-next chain starting at `start`.
fn keep_group_end(boxes: &[PositionedBox], start: usize) -> &PositionedBox {
    let mut end = start;
    while boxes[end].keep_with_next
        && end + 1 < boxes.len()
        && !boxes[end + 1].page_break_before
    {
        end += 1;
    }
    &boxes[end]
}

#[cfg(test)]
mod tests {
    use super::*;

    const A4: PageGeometry = PageGeometry {
        width: 595.0,
        height: 842.0,
        margin_top: 28.0,
        margin_bottom: 28.0,
    };

    fn line(y: f32, height: f32, text: &str) -> PositionedBox {
        let mut item = LayoutBox::new(28.0, 0.0, 500.0, height);
        item.text = Some(TextLine {
            baseline: height * 0.8,
            runs: vec![TextRun {
                text: text.to_string(),
                x_offset: 0.0,
                width: 50.0,
                font: Default::default(),
                font_size: 11.0,
                color: [0.0; 3],
                underline: false,
                strike: false,
            }],
        });
        PositionedBox {
            y,
            height,
            items: vec![item],
            page_break_before: false,
            keep_with_next: false,
        }
    }

    fn lines(count: usize, height: f32) -> Vec<PositionedBox> {
        (0..count)
            .map(|i| line(i as f32 * height, height, &format!("line {i}")))
            .collect()
    }

    #[test]
    fn single_page() {
        let config = paginate(&lines(3, 15.0), &A4, "t");
        assert_eq!(config.pages.len(), 1);
        assert_eq!(config.pages[0].boxes[0].y, 28.0);
        assert_eq!(config.pages[0].boxes[2].y, 58.0);
    }

    #[test]
    fn multiple_pages() {
        // 786pt of content height fits 52 lines of 15pt
        let config = paginate(&lines(120, 15.0), &A4, "t");
        assert_eq!(config.pages.len(), 3);
        assert_eq!(config.pages[0].boxes.len(), 52);
        // the first box of a new page starts at the top margin
        assert_eq!(config.pages[1].boxes[0].y, 28.0);
        assert_eq!(config.pages[1].page_index, 1);
    }

    #[test]
    fn empty_document_has_one_page() {
        let config = paginate(&[], &A4, "empty");
        assert_eq!(config.pages.len(), 1);
        assert!(config.pages[0].boxes.is_empty());
        assert_eq!(config.title, "empty");
    }

    #[test]
    fn forced_break() {
        let mut boxes = lines(4, 15.0);
        boxes[2].page_break_before = true;
        let config = paginate(&boxes, &A4, "t");
        assert_eq!(config.page_text(0), vec!["line 0", "line 1"]);
        assert_eq!(config.page_text(1), vec!["line 2", "line 3"]);
    }

    #[test]
    fn break_on_first_box_does_not_leave_blank_page() {
        let mut boxes = lines(2, 15.0);
        boxes[0].page_break_before = true;
        assert_eq!(paginate(&boxes, &A4, "t").pages.len(), 1);
    }

    #[test]
    fn heading_moves_with_following_line() {
        let mut boxes = lines(53, 15.0);
        // line 51 fits at the bottom of page one but line 52 does not
        boxes[51].keep_with_next = true;
        let config = paginate(&boxes, &A4, "t");
        assert_eq!(config.page_text(1), vec!["line 51", "line 52"]);
    }
}
