pub mod fontdue_rasterizer;
