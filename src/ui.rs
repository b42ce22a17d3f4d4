use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use std::io;

use thought_capture::{notify, Category, Entry, EntryStore, Filter, Persistence, Transport};

/// What the keyboard currently drives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Normal,
    Adding(String),
    Editing { id: i64, buffer: String },
    Retyping { id: i64 },
    ConfirmDelete { id: i64 },
    ConfirmClear,
}

pub struct App<S: Persistence> {
    pub store: EntryStore<S>,
    pub transport: Box<dyn Transport>,
    pub state: TableState,
    pub mode: Mode,
    pub show_detail: bool,
    /// Last notification shown in the status bar
    pub status: Option<String>,
}

impl<S: Persistence> App<S> {
    pub fn new(store: EntryStore<S>, transport: Box<dyn Transport>) -> Self {
        let mut state = TableState::default();
        if !store.is_empty() {
            state.select(Some(0));
        }

        Self {
            store,
            transport,
            state,
            mode: Mode::Normal,
            show_detail: false,
            status: None,
        }
    }

    /// Ids of the rows currently on screen, in display order
    pub fn visible_ids(&self) -> Vec<i64> {
        self.store.visible().map(|e| e.id).collect()
    }

    pub fn selected_entry(&self) -> Option<&Entry> {
        let id = self.selected_id()?;
        self.store.get(id)
    }

    fn selected_id(&self) -> Option<i64> {
        let ids = self.visible_ids();
        self.state.selected().and_then(|i| ids.get(i).copied())
    }

    /// Keep the selection inside the visible list after it changed size
    fn clamp_selection(&mut self) {
        let len = self.store.visible().count();
        match self.state.selected() {
            _ if len == 0 => self.state.select(None),
            Some(i) if i >= len => self.state.select(Some(len - 1)),
            None => self.state.select(Some(0)),
            _ => {}
        }
    }

    pub fn apply_filter(&mut self, filter: Filter) {
        self.store.set_filter(filter);

        // Reset selection to first item
        if self.store.visible().next().is_some() {
            self.state.select(Some(0));
        } else {
            self.state.select(None);
        }
    }

    pub fn next(&mut self) {
        let len = self.store.visible().count();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i >= len - 1 => 0,
            Some(i) => i + 1,
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.store.visible().count();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.state.select(Some(i));
    }

    pub fn page_down(&mut self) {
        let len = self.store.visible().count();
        if len == 0 {
            return;
        }
        let i = self.state.selected().map_or(0, |i| (i + 20).min(len - 1));
        self.state.select(Some(i));
    }

    pub fn page_up(&mut self) {
        let i = self.state.selected().map_or(0, |i| i.saturating_sub(20));
        self.state.select(Some(i));
    }

    fn report<T>(&mut self, result: thought_capture::StoreResult<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                self.status = Some(format!("Ошибка: {}", e));
                None
            }
        }
    }

    fn submit_new(&mut self, text: &str) {
        let result = self.store.add(text);
        if let Some(Some(entry)) = self.report(result) {
            self.status = Some(notify::added(&entry));
            // New entries are prepended; select it if the filter shows it
            if self.store.filter().matches(entry.category) {
                self.state.select(Some(0));
            }
        }
        self.clamp_selection();
    }

    fn submit_edit(&mut self, id: i64, text: &str) {
        let result = self.store.edit(id, text);
        if let Some(true) = self.report(result) {
            if let Some(entry) = self.store.get(id) {
                self.status = Some(format!("Обновлено: {}", entry.category.label()));
            }
        }
        self.clamp_selection();
    }

    fn export(&mut self) {
        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(rt) => rt,
            Err(e) => {
                self.status = Some(format!("Ошибка экспорта: {}", e));
                return;
            }
        };

        let result = runtime.block_on(self.store.export_and_clear(self.transport.as_ref()));
        self.status = Some(notify::export_result(&result));
        self.clamp_selection();
    }

    /// Apply one key press. Returns true when the app should quit.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        match std::mem::replace(&mut self.mode, Mode::Normal) {
            Mode::Normal => return self.handle_normal_key(key),

            Mode::Adding(mut buffer) => match key.code {
                KeyCode::Enter => self.submit_new(&buffer),
                KeyCode::Esc => {}
                KeyCode::Backspace => {
                    buffer.pop();
                    self.mode = Mode::Adding(buffer);
                }
                KeyCode::Char(c) => {
                    buffer.push(c);
                    self.mode = Mode::Adding(buffer);
                }
                _ => self.mode = Mode::Adding(buffer),
            },

            Mode::Editing { id, mut buffer } => match key.code {
                KeyCode::Enter => self.submit_edit(id, &buffer),
                KeyCode::Esc => {}
                KeyCode::Backspace => {
                    buffer.pop();
                    self.mode = Mode::Editing { id, buffer };
                }
                KeyCode::Char(c) => {
                    buffer.push(c);
                    self.mode = Mode::Editing { id, buffer };
                }
                _ => self.mode = Mode::Editing { id, buffer },
            },

            Mode::Retyping { id } => {
                let choice = match key.code {
                    KeyCode::Char(c) => c.to_digit(10).and_then(|d| Category::from_choice(d as usize)),
                    _ => None,
                };
                if let Some(category) = choice {
                    let result = self.store.retype(id, category.as_str());
                    if let Some(true) = self.report(result) {
                        self.status = Some(format!("Тип изменён: {}", category.label()));
                    }
                    self.clamp_selection();
                }
            }

            Mode::ConfirmDelete { id } => {
                if matches!(key.code, KeyCode::Char('y') | KeyCode::Char('Y')) {
                    let result = self.store.delete(id);
                    if let Some(true) = self.report(result) {
                        self.status = Some("Запись удалена".to_string());
                    }
                    self.clamp_selection();
                }
            }

            Mode::ConfirmClear => {
                if matches!(key.code, KeyCode::Char('y') | KeyCode::Char('Y')) {
                    let result = self.store.clear();
                    if self.report(result).is_some() {
                        self.status = Some("Все записи удалены".to_string());
                    }
                    self.clamp_selection();
                }
            }
        }
        false
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Char('a') | KeyCode::Char('i') => self.mode = Mode::Adding(String::new()),
            KeyCode::Enter => self.show_detail = !self.show_detail,
            KeyCode::Char(c @ '1'..='5') => {
                let index = c as usize - '1' as usize;
                self.apply_filter(Filter::ALL[index]);
            }
            KeyCode::Char(' ') => {
                if let Some(id) = self.selected_id() {
                    let result = self.store.toggle(id);
                    self.report(result);
                }
            }
            KeyCode::Char('e') => {
                if let Some(entry) = self.selected_entry() {
                    self.mode = Mode::Editing {
                        id: entry.id,
                        buffer: entry.text.clone(),
                    };
                }
            }
            KeyCode::Char('t') => {
                if let Some(id) = self.selected_id() {
                    self.mode = Mode::Retyping { id };
                }
            }
            KeyCode::Char('d') => {
                if let Some(id) = self.selected_id() {
                    self.mode = Mode::ConfirmDelete { id };
                }
            }
            KeyCode::Char('C') => {
                if !self.store.is_empty() {
                    self.mode = Mode::ConfirmClear;
                }
            }
            KeyCode::Char('x') => self.export(),
            KeyCode::Down | KeyCode::Char('j') => self.next(),
            KeyCode::Up | KeyCode::Char('k') => self.previous(),
            KeyCode::PageDown => self.page_down(),
            KeyCode::PageUp => self.page_up(),
            KeyCode::Home => self.clamp_selection_to(0),
            KeyCode::End => {
                let len = self.store.visible().count();
                if len > 0 {
                    self.clamp_selection_to(len - 1);
                }
            }
            _ => {}
        }
        false
    }

    fn clamp_selection_to(&mut self, index: usize) {
        self.state.select(Some(index));
        self.clamp_selection();
    }
}

pub fn run_ui<S: Persistence>(app: &mut App<S>) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("Error: {:?}", err);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend, S: Persistence>(
    terminal: &mut Terminal<B>,
    app: &mut App<S>,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if app.handle_key(key) {
                return Ok(());
            }
        }
    }
}

fn ui<S: Persistence>(f: &mut Frame, app: &mut App<S>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with filters
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Input / status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    if app.show_detail {
        let content_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(60), // Entry list
                Constraint::Percentage(40), // Detail panel
            ])
            .split(chunks[1]);

        render_table(f, content_chunks[0], app);
        render_detail_panel(f, content_chunks[1], app);
    } else {
        render_table(f, chunks[1], app);
    }

    render_status_bar(f, chunks[2], app);
}

fn category_color(category: Category) -> Color {
    match category {
        Category::Task => Color::Yellow,
        Category::Purchase => Color::Green,
        Category::Idea => Color::Magenta,
        Category::Thought => Color::Cyan,
    }
}

fn render_header<S: Persistence>(f: &mut Frame, area: Rect, app: &App<S>) {
    let counts = app.store.counts();

    let mut tab_spans = vec![];
    for (i, filter) in Filter::ALL.iter().enumerate() {
        if i > 0 {
            tab_spans.push(Span::raw(" │ "));
        }

        let count = match filter {
            Filter::All => app.store.len(),
            Filter::Only(c) => counts
                .iter()
                .find(|(category, _)| category == c)
                .map_or(0, |(_, n)| *n),
        };

        let style = if *filter == app.store.filter() {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        tab_spans.push(Span::styled(format!("{} {} ({})", i + 1, filter.label(), count), style));
    }

    let header = Paragraph::new(vec![Line::from(tab_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(" Мысли "),
    );

    f.render_widget(header, area);
}

fn render_table<S: Persistence>(f: &mut Frame, area: Rect, app: &mut App<S>) {
    let header_cells = ["", "Тип", "Дата", "Текст"].iter().map(|h| {
        Cell::from(*h).style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    });

    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let rows: Vec<Row> = app
        .store
        .visible()
        .map(|entry| {
            let color = category_color(entry.category);
            let text_style = if entry.completed {
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::CROSSED_OUT)
            } else {
                Style::default()
            };

            let cells = vec![
                Cell::from(if entry.completed { "✓" } else { " " }),
                Cell::from(entry.category.label()).style(Style::default().fg(color)),
                Cell::from(entry.formatted_timestamp()),
                Cell::from(truncate(&entry.text, 80)).style(text_style),
            ];

            Row::new(cells).height(1)
        })
        .collect();

    let empty = rows.is_empty();
    let table = Table::new(
        rows,
        [
            Constraint::Length(2),
            Constraint::Length(9),
            Constraint::Length(21),
            Constraint::Min(10),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(if empty {
                " Нет записей для отображения "
            } else {
                " Записи "
            }),
    )
    .highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_status_bar<S: Persistence>(f: &mut Frame, area: Rect, app: &App<S>) {
    let key = |k: &'static str| Span::styled(k, Style::default().fg(Color::Yellow));

    let (title, spans) = match &app.mode {
        Mode::Adding(buffer) => (
            " Новая запись (Enter добавить, Esc отмена) ",
            vec![Span::raw(buffer.clone()), Span::styled("▏", Style::default().fg(Color::Yellow))],
        ),
        Mode::Editing { buffer, .. } => (
            " Редактировать (Enter сохранить, Esc отмена) ",
            vec![Span::raw(buffer.clone()), Span::styled("▏", Style::default().fg(Color::Yellow))],
        ),
        Mode::Retyping { .. } => {
            let mut spans = vec![Span::raw("Выберите тип: ")];
            for (i, category) in Category::ALL.iter().enumerate() {
                spans.push(key(["1", "2", "3", "4"][i]));
                spans.push(Span::raw(format!(". {}  ", category.label())));
            }
            (" Изменить тип ", spans)
        }
        Mode::ConfirmDelete { .. } => (
            " Подтверждение ",
            vec![Span::raw("Удалить эту запись? "), key("y"), Span::raw(" / любая клавиша")],
        ),
        Mode::ConfirmClear => (
            " Подтверждение ",
            vec![
                Span::raw("Очистить все записи? Это действие нельзя отменить. "),
                key("y"),
                Span::raw(" / любая клавиша"),
            ],
        ),
        Mode::Normal => {
            let selected = app.state.selected().map(|i| i + 1).unwrap_or(0);
            let total = app.store.visible().count();

            let mut spans = vec![Span::styled(
                format!(" {}/{} ", selected, total),
                Style::default().fg(Color::Cyan),
            )];
            if let Some(status) = &app.status {
                spans.push(Span::styled(format!("{} ", status), Style::default().fg(Color::Green)));
            }
            spans.extend([
                Span::raw("| "),
                key("a"),
                Span::raw(" Add | "),
                key("Space"),
                Span::raw(" Done | "),
                key("e"),
                Span::raw(" Edit | "),
                key("t"),
                Span::raw(" Type | "),
                key("d"),
                Span::raw(" Del | "),
                key("1-5"),
                Span::raw(" Filter | "),
                key("x"),
                Span::raw(" Export | "),
                key("C"),
                Span::raw(" Clear | "),
                Span::styled("q", Style::default().fg(Color::Red)),
                Span::raw(" Quit"),
            ]);
            ("", spans)
        }
    };

    let status_bar = Paragraph::new(vec![Line::from(spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(title),
    );

    f.render_widget(status_bar, area);
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

fn render_detail_panel<S: Persistence>(f: &mut Frame, area: Rect, app: &App<S>) {
    let Some(entry) = app.selected_entry() else {
        let no_selection = Paragraph::new("Нет выбранной записи").block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Yellow))
                .title(" Запись "),
        );
        f.render_widget(no_selection, area);
        return;
    };

    let label = |name: &'static str| {
        Span::styled(name, Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
    };

    let mut content = vec![
        Line::from(""),
        Line::from(vec![
            label("  Тип: "),
            Span::styled(entry.category.label(), Style::default().fg(category_color(entry.category))),
        ]),
        Line::from(""),
        Line::from(vec![label("  Дата: "), Span::raw(entry.formatted_timestamp())]),
        Line::from(""),
        Line::from(vec![label("  Статус: "), Span::raw(entry.status_label())]),
        Line::from(""),
        Line::from(vec![label("  ID: "), Span::raw(entry.id.to_string())]),
        Line::from(""),
        Line::from("  ─────────────────────────────────────"),
        Line::from(""),
    ];

    for line in wrap_text(&entry.text, 35) {
        content.push(Line::from(format!("  {}", line)));
    }

    content.push(Line::from(""));
    content.push(Line::from(vec![Span::styled(
        "  Enter: закрыть",
        Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::ITALIC),
    )]));

    let detail_panel = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow))
            .title(" Запись "),
    );

    f.render_widget(detail_panel, area);
}

fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current_line = String::new();

    for word in text.split_whitespace() {
        let needed = current_line.chars().count() + word.chars().count() + 1;
        if current_line.is_empty() || needed <= width {
            if !current_line.is_empty() {
                current_line.push(' ');
            }
            current_line.push_str(word);
        } else {
            lines.push(std::mem::take(&mut current_line));
            current_line.push_str(word);
        }
    }

    if !current_line.is_empty() {
        lines.push(current_line);
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;
    use thought_capture::{CsvTransport, MemoryStorage};

    fn app() -> App<MemoryStorage> {
        let store = EntryStore::open(MemoryStorage::new()).unwrap();
        App::new(store, Box::new(CsvTransport::new("unused.csv")))
    }

    fn press(app: &mut App<MemoryStorage>, code: KeyCode) -> bool {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_text(app: &mut App<MemoryStorage>, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    #[test]
    fn test_add_via_input_mode() {
        let mut app = app();

        press(&mut app, KeyCode::Char('a'));
        type_text(&mut app, "Купить молоко");
        press(&mut app, KeyCode::Enter);

        assert_eq!(app.mode, Mode::Normal);
        assert_eq!(app.store.len(), 1);
        assert_eq!(app.store.entries()[0].category, Category::Purchase);
        assert_eq!(app.status.as_deref(), Some("Запись добавлена как Покупка"));
        assert_eq!(app.state.selected(), Some(0));
    }

    #[test]
    fn test_escape_cancels_add() {
        let mut app = app();

        press(&mut app, KeyCode::Char('a'));
        type_text(&mut app, "draft");
        press(&mut app, KeyCode::Esc);

        assert_eq!(app.mode, Mode::Normal);
        assert!(app.store.is_empty());
    }

    #[test]
    fn test_filter_keys_and_toggle() {
        let mut app = app();
        app.store.add("Позвонить маме").unwrap();
        app.store.add("Купить хлеб").unwrap();
        app.clamp_selection();

        press(&mut app, KeyCode::Char('3'));
        assert_eq!(app.store.filter(), Filter::Only(Category::Purchase));
        assert_eq!(app.visible_ids().len(), 1);

        press(&mut app, KeyCode::Char(' '));
        assert!(app.selected_entry().unwrap().completed);

        press(&mut app, KeyCode::Char('1'));
        assert_eq!(app.store.filter(), Filter::All);
        assert_eq!(app.visible_ids().len(), 2);
    }

    #[test]
    fn test_retype_menu() {
        let mut app = app();
        app.store.add("Позвонить маме").unwrap();
        app.clamp_selection();

        press(&mut app, KeyCode::Char('t'));
        press(&mut app, KeyCode::Char('3'));
        assert_eq!(app.store.entries()[0].category, Category::Idea);

        // Out-of-range choice leaves the entry alone
        press(&mut app, KeyCode::Char('t'));
        press(&mut app, KeyCode::Char('9'));
        assert_eq!(app.mode, Mode::Normal);
        assert_eq!(app.store.entries()[0].category, Category::Idea);
    }

    #[test]
    fn test_delete_requires_confirmation() {
        let mut app = app();
        app.store.add("Позвонить маме").unwrap();
        app.clamp_selection();

        press(&mut app, KeyCode::Char('d'));
        press(&mut app, KeyCode::Char('n'));
        assert_eq!(app.store.len(), 1);

        press(&mut app, KeyCode::Char('d'));
        press(&mut app, KeyCode::Char('y'));
        assert!(app.store.is_empty());
        assert_eq!(app.state.selected(), None);
    }

    #[test]
    fn test_edit_prefills_and_reclassifies() {
        let mut app = app();
        app.store.add("просто мысль").unwrap();
        app.clamp_selection();

        press(&mut app, KeyCode::Char('e'));
        assert!(matches!(&app.mode, Mode::Editing { buffer, .. } if buffer == "просто мысль"));

        for _ in 0.."просто мысль".chars().count() {
            press(&mut app, KeyCode::Backspace);
        }
        type_text(&mut app, "стартап");
        press(&mut app, KeyCode::Enter);

        assert_eq!(app.store.entries()[0].text, "стартап");
        assert_eq!(app.store.entries()[0].category, Category::Idea);
    }

    #[test]
    fn test_quit() {
        let mut app = app();
        assert!(press(&mut app, KeyCode::Char('q')));
    }

    #[test]
    fn test_wrap_text() {
        assert_eq!(wrap_text("one two three", 7), vec!["one two", "three"]);
        assert!(wrap_text("", 10).is_empty());
    }
}
