mod drawing;
mod editor;

pub use drawing::DrawingSession;
pub use editor::MapEditor;
