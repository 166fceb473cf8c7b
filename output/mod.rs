pub mod plot;
pub mod table;

pub use plot::{PlotError, render_curves, render_surface};
pub use table::{
    CURVE_COLUMNS, GRID_COLUMNS, TableError, read_grid, read_grid_rows, write_curves, write_grid,
    write_grid_rows, write_matrix,
};
