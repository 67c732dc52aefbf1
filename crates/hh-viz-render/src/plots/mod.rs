pub mod limit_bars;

mod axes_draw;
