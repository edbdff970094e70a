/// What the navigation chrome should look like right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuLayout {
    pub navbar_visible: bool,
    pub mobile_menu_visible: bool,
    pub dropdown_open: bool,
    pub content_hidden: bool,
    pub footer_hidden: bool,
    pub scroll_locked: bool,
}

/// Responsive nav state for one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Menu {
    breakpoint: u32,
    width: u32,
    dropdown_open: bool,
}

impl Menu {
    pub fn new(breakpoint: u32, width: u32) -> Self {
        Self {
            breakpoint,
            width,
            dropdown_open: false,
        }
    }

    pub fn is_mobile(&self) -> bool {
        self.width <= self.breakpoint
    }

    pub fn dropdown_open(&self) -> bool {
        self.dropdown_open
    }

    /// Layout after the window settles at `width`. Resizing never changes
    /// whether the dropdown is open, only whether it matters.
    pub fn on_resize(&mut self, width: u32) -> MenuLayout {
        self.width = width;
        self.layout()
    }

    /// Hamburger click. Opening hides the page behind the dropdown and stops
    /// it scrolling.
    pub fn toggle_dropdown(&mut self) -> MenuLayout {
        self.dropdown_open = !self.dropdown_open;
        MenuLayout {
            scroll_locked: self.dropdown_open,
            ..self.layout()
        }
    }

    pub fn layout(&self) -> MenuLayout {
        let mobile = self.is_mobile();
        let covered = mobile && self.dropdown_open;
        MenuLayout {
            navbar_visible: !mobile,
            mobile_menu_visible: mobile,
            dropdown_open: self.dropdown_open,
            content_hidden: covered,
            footer_hidden: covered,
            scroll_locked: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shrinking_past_breakpoint_switches_to_mobile_menu() {
        let mut menu = Menu::new(827, 900);
        let wide = menu.layout();
        assert!(wide.navbar_visible);
        assert!(!wide.mobile_menu_visible);

        let narrow = menu.on_resize(800);
        assert!(!narrow.navbar_visible);
        assert!(narrow.mobile_menu_visible);
        assert!(!narrow.content_hidden);
    }

    #[test]
    fn breakpoint_is_per_page() {
        let mut menu = Menu::new(768, 900);
        assert!(menu.on_resize(800).navbar_visible);
        assert!(!menu.on_resize(768).navbar_visible);
    }

    #[test]
    fn open_dropdown_covers_content_until_widened() {
        let mut menu = Menu::new(827, 600);

        let open = menu.toggle_dropdown();
        assert!(open.dropdown_open);
        assert!(open.content_hidden && open.footer_hidden && open.scroll_locked);

        let wide = menu.on_resize(1200);
        assert!(wide.navbar_visible);
        assert!(!wide.content_hidden);
        assert!(!wide.scroll_locked);

        let closed = menu.toggle_dropdown();
        assert!(!closed.dropdown_open);
        assert!(!closed.content_hidden);
    }
}
